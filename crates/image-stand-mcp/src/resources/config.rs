//! Resource: stand://config

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::json;

use crate::session::StandSessionManager;
use crate::types::{McpResult, ReadResourceResult};

use super::templates::CONFIG_URI;

/// Effective scoring configuration. Keys are masked.
pub async fn read_config(
    session: &Arc<Mutex<StandSessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;
    let orchestrator = session.orchestrator();
    let scorer = orchestrator.engine().scorer();
    let settings = session.settings();

    let content = json!({
        "default_method": settings.method,
        "sensitivity": {
            "current": session.sensitivity().get().value(),
            "startup": settings.sensitivity.value(),
        },
        "weights": {
            "embedding": settings.weights.embedding(),
            "structural": settings.weights.structural(),
        },
        "calibration": settings.calibration,
        "extractor": scorer.extractor_version(),
        "images_dir": session.images_dir().map(|p| p.display().to_string()),
        "keys": session.keys(),
        "open_rounds": session.round_count(),
    });

    Ok(ReadResourceResult::json(CONFIG_URI, &content))
}
