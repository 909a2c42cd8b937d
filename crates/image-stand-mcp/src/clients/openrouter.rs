//! Speech-to-text through OpenRouter chat completions.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use image_stand::{AudioMime, StandError, StandResult, Transcriber};

use super::{error_message, transport_error};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai";
pub const TRANSCRIPTION_MODEL: &str = "google/gemini-2.0-flash-lite-001";

const INSTRUCTION: &str =
    "Transcribe this audio to text. Return only the transcribed text without any additional commentary.";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn payload(audio: &[u8], mime: AudioMime) -> serde_json::Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        json!({
            "model": TRANSCRIPTION_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": INSTRUCTION },
                    {
                        "type": "input_audio",
                        "input_audio": {
                            "data": format!("data:{mime};base64,{encoded}"),
                            "format": mime.format(),
                        }
                    }
                ]
            }],
            "temperature": 0.1,
            "max_tokens": 1000
        })
    }
}

#[async_trait]
impl Transcriber for OpenRouterClient {
    async fn transcribe(&self, audio: &[u8], mime: AudioMime) -> StandResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StandError::provider(None, "OPENROUTER_API_KEY is not configured"))?;

        let response = self
            .http
            .post(format!("{}/api/v1/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&Self::payload(audio, mime))
            .send()
            .await
            .map_err(|e| transport_error("OpenRouter", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("OpenRouter", e))?;
        if !status.is_success() {
            return Err(StandError::provider(
                Some(status.as_u16()),
                format!("OpenRouter API error: {}", error_message(&body)),
            ));
        }

        let completion: Completion = serde_json::from_str(&body).map_err(|e| {
            StandError::provider(Some(status.as_u16()), format!("unexpected response format: {e}"))
        })?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| StandError::provider(Some(status.as_u16()), "response had no choices"))?;

        let text = text.trim().to_string();
        tracing::info!("Transcribed {} bytes of {mime} into {} chars", audio.len(), text.len());
        Ok(text)
    }
}
