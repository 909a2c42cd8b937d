//! Routes JSON-RPC requests to tools and resources.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::resources::ResourceRegistry;
use crate::session::StandSessionManager;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

fn to_value(value: &impl Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

/// Dispatches incoming JSON-RPC messages.
///
/// The handler takes `&self`, so a transport may run several requests at
/// once; rounds are locked individually by the tools.
pub struct ProtocolHandler {
    session: Arc<Mutex<StandSessionManager>>,
    capabilities: Mutex<NegotiatedCapabilities>,
}

impl ProtocolHandler {
    pub fn new(session: Arc<Mutex<StandSessionManager>>) -> Self {
        Self {
            session,
            capabilities: Mutex::new(NegotiatedCapabilities::default()),
        }
    }

    /// Handle one message. Notifications produce no response.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(&notif).await;
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        let started = Instant::now();
        let outcome = match request.validate() {
            Ok(()) => self.dispatch(&request).await,
            Err(e) => Err(e),
        };

        tracing::debug!(
            method = %request.method,
            ok = outcome.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );

        let id = request.id;
        let envelope = match outcome {
            Ok(result) => serde_json::to_value(JsonRpcResponse::new(id, result)),
            Err(e) => {
                if matches!(e, McpError::InternalError(_) | McpError::Io(_)) {
                    tracing::error!("{e}");
                }
                serde_json::to_value(e.to_json_rpc_error(id))
            }
        };
        envelope.unwrap_or_default()
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = request.params()?;
                let result = self.capabilities.lock().await.negotiate(params);
                to_value(&result)
            }
            "ping" => Ok(json!({})),
            "shutdown" => {
                let rounds = self.session.lock().await.round_count();
                tracing::info!("Shutdown requested with {rounds} open rounds");
                Ok(json!({}))
            }

            "tools/list" => Ok(json!({ "tools": ToolRegistry::list_tools() })),
            "tools/call" => {
                let params: ToolCallParams = request.params()?;
                let result =
                    ToolRegistry::call(&params.name, params.arguments, &self.session).await?;
                to_value(&result)
            }

            "resources/list" => Ok(json!({ "resources": ResourceRegistry::list_resources() })),
            "resources/templates/list" => Ok(json!({
                "resourceTemplates": ResourceRegistry::list_templates()
            })),
            "resources/read" => {
                let params: ResourceReadParams = request.params()?;
                let result = ResourceRegistry::read(&params.uri, &self.session).await?;
                to_value(&result)
            }

            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" => {
                tracing::debug!("Cancellation ignored; tool calls run to completion");
            }
            other => tracing::debug!("Unhandled notification: {other}"),
        }
    }
}
