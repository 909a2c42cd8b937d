//! Newline-delimited JSON-RPC over stdin and stdout.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult, RequestId};

use super::framing;

/// Stdio transport for desktop MCP clients.
///
/// Each request runs on its own task so a slow generation never holds up a
/// ping or a score. Responses are written as they complete and may arrive
/// out of order; clients match them by id.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Serve until stdin closes and every in-flight request has answered.
    pub async fn run(&self) -> McpResult<()> {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer = tokio::spawn(write_frames(rx));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        tracing::info!("Stdio transport started");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match framing::parse_message(&line) {
                Ok(msg) => {
                    let handler = self.handler.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = handler.handle_message(msg).await {
                            // Only fails once the writer is gone.
                            let _ = tx.send(response);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    let error = serde_json::to_value(e.to_json_rpc_error(RequestId::Null))?;
                    let _ = tx.send(error);
                }
            }
        }

        tracing::info!("EOF on stdin, shutting down");
        drop(tx);
        writer
            .await
            .map_err(|e| McpError::InternalError(e.to_string()))?
    }
}

/// Drain responses to stdout until every sender is dropped.
async fn write_frames(mut rx: mpsc::UnboundedReceiver<Value>) -> McpResult<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(value) = rx.recv().await {
        let framed = framing::frame_message(&value)?;
        stdout.write_all(framed.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
