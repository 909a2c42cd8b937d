//! Resources: stand://rounds and stand://round/{id}

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::json;

use crate::session::StandSessionManager;
use crate::types::{McpResult, ReadResourceResult};

use super::templates::ROUNDS_URI;

pub async fn read_rounds(
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;
    let summaries = session.summaries();
    let content = json!({
        "count": summaries.len(),
        // Rounds mid-call are left out until they settle.
        "busy": session.round_count() - summaries.len(),
        "rounds": summaries,
    });
    Ok(ReadResourceResult::json(ROUNDS_URI, &content))
}

pub async fn read_round(
    uri: &str,
    id: &str,
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ReadResourceResult> {
    let shared = session.lock().await.round(id)?;
    let summary = shared.lock().await.summary();
    Ok(ReadResourceResult::json(uri, &summary))
}
