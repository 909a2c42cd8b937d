//! Resource registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::session::StandSessionManager;
use crate::types::{
    McpError, McpResult, ReadResourceResult, ResourceDefinition, ResourceTemplateDefinition,
};

use super::templates::{ARTIFACTS_URI, CONFIG_URI, ROUNDS_URI, ROUND_PREFIX};
use super::{artifacts, config, rounds, templates};

pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn list_templates() -> Vec<ResourceTemplateDefinition> {
        templates::list_templates()
    }

    pub fn list_resources() -> Vec<ResourceDefinition> {
        templates::list_resources()
    }

    pub async fn read(
        uri: &str,
        session: &Arc<Mutex<StandSessionManager>>,
    ) -> McpResult<ReadResourceResult> {
        if let Some(id) = uri.strip_prefix(ROUND_PREFIX) {
            rounds::read_round(uri, id, session).await
        } else if uri == CONFIG_URI {
            config::read_config(session).await
        } else if uri == ROUNDS_URI {
            rounds::read_rounds(session).await
        } else if uri == ARTIFACTS_URI {
            artifacts::read_artifacts(session).await
        } else {
            Err(McpError::ResourceNotFound(uri.to_string()))
        }
    }
}
