//! JSON-RPC 2.0 envelopes carried over stdio.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{McpError, McpResult};

pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier: string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Reject envelopes with the wrong version tag or no method.
    pub fn validate(&self) -> McpResult<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(McpError::InvalidRequest(format!(
                "Expected jsonrpc \"{JSONRPC_VERSION}\", got \"{}\"",
                self.jsonrpc
            )));
        }
        if self.method.is_empty() {
            return Err(McpError::InvalidRequest("Method name must not be empty".into()));
        }
        Ok(())
    }

    /// Decode required params into `T`.
    pub fn params<T: DeserializeOwned>(&self) -> McpResult<T> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| McpError::InvalidParams(format!("{} requires params", self.method)))?;
        serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JsonRpcErrorObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A message with no id. Never answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// What a client may send. The server never issues requests of its own, so
/// client-side responses are not expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_message_kinds() {
        let req: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap();
        assert!(matches!(req, JsonRpcMessage::Request(r) if r.id == RequestId::String("a".into())));

        let note: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialized"}"#).unwrap();
        assert!(matches!(note, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn test_validate_and_params() {
        let mut req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"stand://config"}}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        let params: serde_json::Map<String, Value> = req.params().unwrap();
        assert_eq!(params["uri"], "stand://config");

        req.params = None;
        assert!(matches!(req.params::<Value>(), Err(McpError::InvalidParams(_))));

        req.jsonrpc = "1.0".into();
        assert!(matches!(req.validate(), Err(McpError::InvalidRequest(_))));
    }
}
