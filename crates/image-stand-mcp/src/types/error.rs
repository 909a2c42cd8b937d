//! Error types and JSON-RPC error codes for the MCP server.

use image_stand::StandError;

use super::jsonrpc::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP and scoring error codes. Every core failure kind has its own code.
pub mod mcp_error_codes {
    pub const RESOURCE_NOT_FOUND: i32 = -32802;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const ROUND_NOT_FOUND: i32 = -32851;

    pub const DECODE_ERROR: i32 = -32860;
    pub const EXTRACTOR_UNAVAILABLE: i32 = -32861;
    pub const EMBEDDING_MISMATCH: i32 = -32862;
    pub const INVALID_WEIGHT: i32 = -32863;
    pub const INVALID_THRESHOLDS: i32 = -32864;
    pub const INVALID_SENSITIVITY: i32 = -32865;
    pub const EMPTY_PROMPT: i32 = -32866;
    pub const UNSUPPORTED_MIME_TYPE: i32 = -32867;
    pub const PROVIDER_ERROR: i32 = -32868;
    pub const STORAGE_ERROR: i32 = -32869;
    pub const ARTIFACT_NOT_FOUND: i32 = -32870;
    pub const INVALID_TRANSITION: i32 = -32871;
    pub const INVALID_INPUT: i32 = -32872;
    pub const INFERENCE_ERROR: i32 = -32873;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Round not found: {0}")]
    RoundNotFound(String),

    #[error(transparent)]
    Stand(#[from] StandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server code for a core error.
pub fn stand_error_code(e: &StandError) -> i32 {
    use mcp_error_codes::*;
    match e {
        StandError::Decode(_) => DECODE_ERROR,
        StandError::ExtractorUnavailable(_) => EXTRACTOR_UNAVAILABLE,
        StandError::Inference(_) => INFERENCE_ERROR,
        StandError::EmbeddingMismatch { .. } => EMBEDDING_MISMATCH,
        StandError::InvalidWeight(_) => INVALID_WEIGHT,
        StandError::InvalidThresholds { .. } => INVALID_THRESHOLDS,
        StandError::InvalidSensitivity(_) => INVALID_SENSITIVITY,
        StandError::EmptyPrompt => EMPTY_PROMPT,
        StandError::UnsupportedMimeType(_) => UNSUPPORTED_MIME_TYPE,
        StandError::Provider { .. } => PROVIDER_ERROR,
        StandError::Storage(_) => STORAGE_ERROR,
        StandError::ArtifactNotFound(_) => ARTIFACT_NOT_FOUND,
        StandError::InvalidTransition(_) => INVALID_TRANSITION,
        StandError::InvalidInput(_) => INVALID_INPUT,
    }
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::ResourceNotFound(_) => RESOURCE_NOT_FOUND,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::RoundNotFound(_) => ROUND_NOT_FOUND,
            McpError::Stand(e) => stand_error_code(e),
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Extra structured detail attached to the JSON-RPC error.
    fn data(&self) -> Option<serde_json::Value> {
        match self {
            McpError::Stand(e) => {
                let mut data = serde_json::json!({ "retryable": e.is_retryable() });
                if let StandError::Provider {
                    status: Some(status),
                    ..
                } = e
                {
                    data["provider_status"] = serde_json::json!(status);
                }
                Some(data)
            }
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
