//! Initialize handshake.

use serde_json::Value;

use crate::types::{InitializeParams, InitializeResult, MCP_VERSION};

/// What the client told us during `initialize`.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client_name: Option<String>,
    pub client: Value,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    /// Record the client and answer with the server's own protocol version,
    /// whatever the client asked for.
    pub fn negotiate(&mut self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client asked for protocol {}; answering with {MCP_VERSION}",
                params.protocol_version
            );
        }

        tracing::info!(
            client = %params.client_info.name,
            version = %params.client_info.version,
            "Client connected"
        );
        self.client_name = Some(params.client_info.name);
        self.client = params.capabilities;

        InitializeResult::for_server()
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::debug!("Handshake complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Implementation, SERVER_NAME};

    #[test]
    fn test_negotiate_answers_with_server_version() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps.negotiate(InitializeParams {
            protocol_version: "1999-01-01".into(),
            capabilities: Value::Null,
            client_info: Implementation {
                name: "t".into(),
                version: "0".into(),
            },
        });
        assert_eq!(result.protocol_version, MCP_VERSION);
        assert_eq!(result.server_info.name, SERVER_NAME);
        assert_eq!(caps.client_name.as_deref(), Some("t"));
        assert!(!caps.initialized);
        caps.mark_initialized();
        assert!(caps.initialized);
    }
}
