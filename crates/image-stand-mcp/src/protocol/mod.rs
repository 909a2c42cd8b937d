//! MCP protocol handling.

pub mod handler;
pub mod negotiation;

pub use handler::ProtocolHandler;
