//! Tool `sensitivity_get`: read the process-wide default sensitivity.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{json, Value};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "sensitivity_get",
        "Current default sensitivity used when a call gives none",
        json!({ "type": "object", "properties": {} }),
    )
}

pub async fn execute(
    _args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let current = session.lock().await.sensitivity().get();
    Ok(ToolCallResult::json(&json!({ "sensitivity": current.value() })))
}
