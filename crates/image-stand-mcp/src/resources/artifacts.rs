//! Resource: stand://artifacts

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{json, Value};

use crate::session::StandSessionManager;
use crate::types::{McpResult, ReadResourceResult};

use super::templates::ARTIFACTS_URI;

pub async fn read_artifacts(
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ReadResourceResult> {
    let store = session.lock().await.store();
    let artifacts: Vec<Value> = store
        .list()?
        .iter()
        .map(|id| json!({ "id": id, "location": store.location(id) }))
        .collect();

    Ok(ReadResourceResult::json(
        ARTIFACTS_URI,
        &json!({ "count": artifacts.len(), "artifacts": artifacts }),
    ))
}
