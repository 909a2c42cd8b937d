//! MCP resource implementations.

pub mod artifacts;
pub mod config;
pub mod registry;
pub mod rounds;
pub mod templates;

pub use registry::ResourceRegistry;
