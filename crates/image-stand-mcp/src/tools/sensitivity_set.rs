//! Tool `sensitivity_set`: replace the process-wide default sensitivity.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::parse_args;

#[derive(Debug, Deserialize)]
struct SetParams {
    value: f32,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "sensitivity_set",
        "Set the default sensitivity. Above 1 is stricter, below 1 more lenient. \
         Applies to every comparison that starts afterwards.",
        json!({
            "type": "object",
            "properties": {
                "value": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "maximum": 10,
                    "description": "New sensitivity in (0, 10]"
                }
            },
            "required": ["value"]
        }),
    )
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: SetParams = parse_args(args)?;
    let setting = session.lock().await.sensitivity();
    let previous = setting.set(params.value)?;

    Ok(ToolCallResult::json(&json!({
        "previous": previous.value(),
        "current": setting.get().value(),
    })))
}
