//! HTTP clients for the generation and transcription providers.

pub mod kie;
pub mod openrouter;

pub use kie::KieClient;
pub use openrouter::OpenRouterClient;

use image_stand::StandError;

/// Pull a human-readable message out of a provider error body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .or_else(|| v.get("msg"))
        })
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> StandError {
    StandError::provider(
        e.status().map(|s| s.as_u16()),
        format!("{provider} request failed: {e}"),
    )
}
