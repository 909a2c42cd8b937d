//! MCP tool implementations.

pub mod artifact_list;
pub mod registry;
pub mod round_edit;
pub mod round_score;
pub mod round_start;
pub mod round_status;
pub mod sensitivity_get;
pub mod sensitivity_set;
pub mod stand_compare;
pub mod transcribe_audio;

pub use registry::ToolRegistry;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use image_stand::decode::decode_base64;
use image_stand::{AudioMime, PromptInput, Round, StandError};

use crate::types::{stand_error_code, McpError, McpResult, ToolCallResult};

pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}

/// Build the prompt source from a text prompt or base64 audio. Exactly one
/// must be given.
pub(crate) fn prompt_input(
    prompt: Option<String>,
    audio: Option<String>,
    audio_mime: Option<String>,
) -> McpResult<PromptInput> {
    match (prompt, audio) {
        (Some(text), None) => Ok(PromptInput::Text(text)),
        (None, Some(data)) => {
            let mime = audio_mime
                .ok_or_else(|| McpError::InvalidParams("audio_mime is required with audio".into()))?;
            let mime = AudioMime::parse(&mime)?;
            let bytes = decode_base64(&data)
                .map_err(|e| McpError::InvalidParams(format!("audio: {e}")))?;
            Ok(PromptInput::Audio { bytes, mime })
        }
        (Some(_), Some(_)) => Err(McpError::InvalidParams(
            "give either prompt or audio, not both".into(),
        )),
        (None, None) => Err(McpError::InvalidParams("prompt or audio is required".into())),
    }
}

/// A call that left the round `Failed` is a tool-level error that still
/// reports where the round ended up. Any other failure, including calls on a
/// round that had already failed, is a request error.
pub(crate) fn round_error(
    round: &Round,
    was_failed: bool,
    err: StandError,
) -> McpResult<ToolCallResult> {
    if !was_failed && round.state().is_failed() {
        Ok(ToolCallResult::json_error(&json!({
            "round_id": round.id,
            "state": round.state().name(),
            "error": err.to_string(),
            "code": stand_error_code(&err),
        })))
    } else {
        Err(err.into())
    }
}
