//! Tool registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::session::StandSessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    artifact_list, round_edit, round_score, round_start, round_status, sensitivity_get,
    sensitivity_set, stand_compare, transcribe_audio,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            stand_compare::definition(),
            sensitivity_get::definition(),
            sensitivity_set::definition(),
            round_start::definition(),
            round_edit::definition(),
            round_score::definition(),
            round_status::definition(),
            transcribe_audio::definition(),
            artifact_list::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        session: &Arc<Mutex<StandSessionManager>>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));
        tracing::debug!("Tool call: {name}");

        match name {
            "stand_compare" => stand_compare::execute(args, session).await,
            "sensitivity_get" => sensitivity_get::execute(args, session).await,
            "sensitivity_set" => sensitivity_set::execute(args, session).await,
            "round_start" => round_start::execute(args, session).await,
            "round_edit" => round_edit::execute(args, session).await,
            "round_score" => round_score::execute(args, session).await,
            "round_status" => round_status::execute(args, session).await,
            "transcribe_audio" => transcribe_audio::execute(args, session).await,
            "artifact_list" => artifact_list::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
