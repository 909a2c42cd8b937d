//! MCP wire types used by the server.

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod server;

pub use content::*;
pub use error::*;
pub use jsonrpc::*;
pub use server::*;
