//! Tool `round_score`: compare a round's latest artifact with its reference.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::ScoreMethod;

use crate::session::StandSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, round_error};

#[derive(Debug, Deserialize)]
struct ScoreParams {
    round_id: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    sensitivity: Option<f32>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "round_score",
        "Score the round's latest artifact against its reference. May be repeated.",
        json!({
            "type": "object",
            "properties": {
                "round_id": { "type": "string" },
                "method": { "type": "string", "enum": ["structural", "embedding", "hybrid"] },
                "sensitivity": { "type": "number" }
            },
            "required": ["round_id"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: ScoreParams = parse_args(args)?;

    let (orchestrator, shared, method, setting) = {
        let session = session.lock().await;
        let method = match params.method.as_deref() {
            Some(m) => m.parse::<ScoreMethod>()?,
            None => session.settings().method,
        };
        (
            session.orchestrator(),
            session.round(&params.round_id)?,
            method,
            session.sensitivity(),
        )
    };

    let mut round = shared.lock_owned().await;
    let was_failed = round.state().is_failed();
    // Read at calibration time, after any wait on the round lock.
    let sensitivity = setting.resolve(params.sensitivity)?;

    // Scoring is CPU bound; keep it off the runtime workers.
    let (round, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = orchestrator.compare_round(&mut round, method, sensitivity);
        (round, outcome)
    })
    .await
    .map_err(|e| McpError::InternalError(e.to_string()))?;

    match outcome {
        Ok(comparison) => Ok(ToolCallResult::json(&json!({
            "round_id": round.id,
            "state": round.state().name(),
            "comparison": comparison,
        }))),
        Err(e) => round_error(&round, was_failed, e),
    }
}
