//! Tool: artifact_list

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{json, Value};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "artifact_list",
        "List stored artifacts with their locations",
        json!({ "type": "object", "properties": {} }),
    )
}

pub async fn execute(
    _args: Value,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ToolCallResult> {
    let store = session.lock().await.store();
    let artifacts: Vec<Value> = store
        .list()?
        .iter()
        .map(|id| json!({ "id": id, "location": store.location(id) }))
        .collect();

    Ok(ToolCallResult::json(&json!({
        "count": artifacts.len(),
        "artifacts": artifacts,
    })))
}
