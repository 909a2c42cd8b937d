//! Tool `stand_compare`: score how closely one image recreates another.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::decode::decode_base64;
use image_stand::{decode_image_with_mime, ScoreMethod};

use crate::session::StandSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::parse_args;

#[derive(Debug, Deserialize)]
struct CompareParams {
    image_a: String,
    image_b: String,
    #[serde(default)]
    mime_a: Option<String>,
    #[serde(default)]
    mime_b: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    sensitivity: Option<f32>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "stand_compare",
        "Score how closely image_b recreates image_a, as a calibrated 0-100 percentage",
        json!({
            "type": "object",
            "properties": {
                "image_a": { "type": "string", "description": "Reference image, base64" },
                "image_b": { "type": "string", "description": "Candidate image, base64" },
                "mime_a": { "type": "string", "description": "MIME hint for image_a" },
                "mime_b": { "type": "string", "description": "MIME hint for image_b" },
                "method": {
                    "type": "string",
                    "enum": ["structural", "embedding", "hybrid"],
                    "description": "Scoring method (server default when omitted)"
                },
                "sensitivity": {
                    "type": "number",
                    "description": "Strictness exponent in (0, 10]; current default when omitted"
                }
            },
            "required": ["image_a", "image_b"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: CompareParams = parse_args(args)?;

    let (engine, method, sensitivity) = {
        let session = session.lock().await;
        let method = match params.method.as_deref() {
            Some(m) => m.parse::<ScoreMethod>()?,
            None => session.settings().method,
        };
        let sensitivity = session.sensitivity().resolve(params.sensitivity)?;
        (session.orchestrator().engine().clone(), method, sensitivity)
    };

    let reference = decode_image_with_mime(&decode_base64(&params.image_a)?, params.mime_a.as_deref())?;
    let candidate = decode_image_with_mime(&decode_base64(&params.image_b)?, params.mime_b.as_deref())?;

    let comparison = tokio::task::spawn_blocking(move || {
        engine.compare_images(&reference, &candidate, method, sensitivity)
    })
    .await
    .map_err(|e| McpError::InternalError(e.to_string()))??;

    Ok(ToolCallResult::json(&comparison))
}
