//! Tool `round_start`: open a round and generate its first artifact.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::decode::decode_base64;
use image_stand::{AspectRatio, GenerationOptions, RoundState};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, prompt_input, round_error};

#[derive(Debug, Deserialize)]
struct StartParams {
    reference_image: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    audio_mime: Option<String>,
    #[serde(flatten)]
    options: GenerationOptions,
}

pub fn definition() -> ToolDefinition {
    let ratios: Vec<&str> = AspectRatio::ALL.iter().map(|r| r.as_str()).collect();
    ToolDefinition::new(
        "round_start",
        "Start a round: describe the reference image by text or voice and generate a \
         recreation. Score it afterwards with round_score.",
        json!({
            "type": "object",
            "properties": {
                "reference_image": { "type": "string", "description": "Image to recreate, base64" },
                "prompt": { "type": "string", "description": "Text description" },
                "audio": { "type": "string", "description": "Spoken description, base64" },
                "audio_mime": {
                    "type": "string",
                    "enum": ["audio/webm", "audio/wav", "audio/mpeg", "audio/ogg", "audio/mp4", "audio/flac"]
                },
                "aspect_ratio": { "type": "string", "enum": ratios, "default": "1:1" },
                "resolution": { "type": "string", "enum": ["1K", "2K", "4K"], "default": "1K" },
                "output_format": { "type": "string", "enum": ["png", "jpg"], "default": "png" }
            },
            "required": ["reference_image"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: StartParams = parse_args(args)?;
    let input = prompt_input(params.prompt, params.audio, params.audio_mime)?;
    let reference = decode_base64(&params.reference_image)?;

    let (orchestrator, round_id, shared) = {
        let mut session = session.lock().await;
        let orchestrator = session.orchestrator();
        let round = orchestrator.start_round(&reference, params.options)?;
        let (id, shared) = session.insert_round(round);
        (orchestrator, id, shared)
    };

    let mut round = shared.lock().await;
    match orchestrator.run_round(&mut round, input).await {
        Ok(artifact) => Ok(ToolCallResult::json(&json!({
            "round_id": round_id,
            "state": round.state().name(),
            "artifact": artifact,
        }))),
        Err(e) => {
            // A round that never left input collection has nothing worth keeping.
            if *round.state() == RoundState::CollectingInput {
                drop(round);
                session.lock().await.remove_round(&round_id);
                return Err(e.into());
            }
            round_error(&round, false, e)
        }
    }
}
