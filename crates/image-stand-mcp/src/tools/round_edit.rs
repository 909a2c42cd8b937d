//! Tool `round_edit`: refine a round's artifact with a follow-up prompt.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::ArtifactId;

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, prompt_input, round_error};

#[derive(Debug, Deserialize)]
struct EditParams {
    round_id: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    audio_mime: Option<String>,
    #[serde(default)]
    artifact_id: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "round_edit",
        "Edit a previous artifact of a round with a new instruction (text or voice)",
        json!({
            "type": "object",
            "properties": {
                "round_id": { "type": "string" },
                "prompt": { "type": "string", "description": "Edit instruction" },
                "audio": { "type": "string", "description": "Spoken instruction, base64" },
                "audio_mime": { "type": "string" },
                "artifact_id": {
                    "type": "string",
                    "description": "Artifact to edit; the latest one when omitted"
                }
            },
            "required": ["round_id"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: EditParams = parse_args(args)?;
    let input = prompt_input(params.prompt, params.audio, params.audio_mime)?;
    let prior = params.artifact_id.as_deref().map(ArtifactId::from);

    let (orchestrator, shared) = {
        let session = session.lock().await;
        (session.orchestrator(), session.round(&params.round_id)?)
    };

    let mut round = shared.lock().await;
    let was_failed = round.state().is_failed();
    match orchestrator.edit_round(&mut round, input, prior.as_ref()).await {
        Ok(artifact) => Ok(ToolCallResult::json(&json!({
            "round_id": round.id,
            "state": round.state().name(),
            "artifact": artifact,
            "iterations": round.artifacts.len(),
        }))),
        Err(e) => round_error(&round, was_failed, e),
    }
}
