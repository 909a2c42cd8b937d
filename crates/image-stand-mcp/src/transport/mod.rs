//! Transport layer. Only stdio is served.

pub mod framing;
pub mod stdio;

pub use stdio::StdioTransport;
