//! image-stand MCP server: scoring, sensitivity and game rounds over JSON-RPC.

pub mod clients;
pub mod config;
pub mod protocol;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use session::StandSessionManager;
pub use transport::StdioTransport;
