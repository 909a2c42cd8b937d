//! Tool: round_status

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::parse_args;

#[derive(Debug, Deserialize)]
struct StatusParams {
    round_id: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "round_status",
        "State, prompt, artifact chain and last score of a round",
        json!({
            "type": "object",
            "properties": { "round_id": { "type": "string" } },
            "required": ["round_id"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: StatusParams = parse_args(args)?;
    let shared = session.lock().await.round(&params.round_id)?;
    let summary = shared.lock().await.summary();
    Ok(ToolCallResult::json(&summary))
}
