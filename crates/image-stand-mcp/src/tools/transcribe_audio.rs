//! Tool `transcribe_audio`: speech to text without starting a round.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::decode::decode_base64;
use image_stand::AudioMime;

use crate::session::StandSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::parse_args;

#[derive(Debug, Deserialize)]
struct TranscribeParams {
    audio: String,
    mime: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "transcribe_audio",
        "Transcribe a voice recording to text",
        json!({
            "type": "object",
            "properties": {
                "audio": { "type": "string", "description": "Recording, base64" },
                "mime": {
                    "type": "string",
                    "enum": ["audio/webm", "audio/wav", "audio/mpeg", "audio/ogg", "audio/mp4", "audio/flac"]
                }
            },
            "required": ["audio", "mime"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: TranscribeParams = parse_args(args)?;
    let mime = AudioMime::parse(&params.mime)?;
    let audio = decode_base64(&params.audio)
        .map_err(|e| McpError::InvalidParams(format!("audio: {e}")))?;

    let transcriber = session.lock().await.transcriber();
    let text = transcriber.transcribe(&audio, mime).await?;

    Ok(ToolCallResult::json(&json!({
        "transcript": text,
        "mime": mime.as_str(),
    })))
}
