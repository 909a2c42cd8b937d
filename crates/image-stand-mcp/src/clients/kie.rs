//! kie.ai image generation: create a task, poll it, download the result.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use image_stand::{GeneratedImage, GenerationRequest, ImageGenerator, StandError, StandResult};

use super::{error_message, transport_error};

pub const DEFAULT_BASE_URL: &str = "https://api.kie.ai";
pub const MODEL_GENERATE: &str = "nano-banana-pro";
pub const MODEL_EDIT: &str = "google/nano-banana-edit";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, what: &str) -> StandResult<T> {
        if self.code != 200 {
            let msg = self
                .msg
                .or(self.message)
                .unwrap_or_else(|| format!("{what} returned code {}", self.code));
            return Err(StandError::provider(u16::try_from(self.code).ok(), msg));
        }
        self.data
            .ok_or_else(|| StandError::provider(Some(200), format!("{what} response had no data")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTask {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    state: Option<String>,
    /// Either a JSON string or an inline object.
    #[serde(default)]
    result_json: Option<Value>,
    #[serde(default)]
    fail_msg: Option<String>,
}

/// Where a polled task stands.
#[derive(Debug, PartialEq)]
enum TaskStatus {
    Done(String),
    Pending(String),
}

impl TaskRecord {
    fn status(self) -> StandResult<TaskStatus> {
        let state = self.state.unwrap_or_else(|| "pending".to_string());
        match state.as_str() {
            "success" => {
                let result = match self.result_json {
                    Some(Value::String(s)) => serde_json::from_str(&s).map_err(|e| {
                        StandError::provider(None, format!("unreadable resultJson: {e}"))
                    })?,
                    Some(v) => v,
                    None => Value::Null,
                };
                result
                    .pointer("/resultUrls/0")
                    .and_then(Value::as_str)
                    .map(|url| TaskStatus::Done(url.to_string()))
                    .ok_or_else(|| StandError::provider(None, "task succeeded without a result URL"))
            }
            "fail" => Err(StandError::provider(
                None,
                self.fail_msg.unwrap_or_else(|| "Task failed".to_string()),
            )),
            _ => Ok(TaskStatus::Pending(state)),
        }
    }
}

/// Client for the kie.ai jobs API.
///
/// Task creation is never retried; polling stops at `max_wait`.
pub struct KieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl KieClient {
    pub fn new(api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("image-stand/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> StandResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| StandError::provider(None, "KIE_API_KEY is not configured"))
    }

    fn payload(request: &GenerationRequest) -> Value {
        let opts = &request.options;
        match &request.reference {
            Some(url) => json!({
                "model": MODEL_EDIT,
                "input": {
                    "prompt": request.prompt,
                    "image_urls": [url],
                    "output_format": opts.output_format.as_str(),
                    "image_size": opts.aspect_ratio.as_str(),
                }
            }),
            None => json!({
                "model": MODEL_GENERATE,
                "input": {
                    "prompt": request.prompt,
                    "aspect_ratio": opts.aspect_ratio.as_str(),
                    "resolution": opts.resolution.as_str(),
                    "output_format": opts.output_format.as_str(),
                }
            }),
        }
    }

    async fn create_task(&self, key: &str, request: &GenerationRequest) -> StandResult<String> {
        let response = self
            .http
            .post(format!("{}/api/v1/jobs/createTask", self.base_url))
            .bearer_auth(key)
            .json(&Self::payload(request))
            .send()
            .await
            .map_err(|e| transport_error("kie.ai", e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error("kie.ai", e))?;
        if !status.is_success() {
            return Err(StandError::provider(Some(status.as_u16()), error_message(&body)));
        }

        let envelope: Envelope<CreatedTask> = serde_json::from_str(&body)
            .map_err(|e| StandError::provider(Some(status.as_u16()), format!("bad createTask body: {e}")))?;
        let task = envelope.into_data("createTask")?;
        tracing::info!("kie.ai task {} created", task.task_id);
        Ok(task.task_id)
    }

    async fn poll_once(&self, key: &str, task_id: &str) -> StandResult<TaskStatus> {
        let response = self
            .http
            .get(format!("{}/api/v1/jobs/recordInfo", self.base_url))
            .query(&[("taskId", task_id)])
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| transport_error("kie.ai", e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error("kie.ai", e))?;
        if !status.is_success() {
            return Err(StandError::provider(Some(status.as_u16()), error_message(&body)));
        }

        let envelope: Envelope<TaskRecord> = serde_json::from_str(&body)
            .map_err(|e| StandError::provider(Some(status.as_u16()), format!("bad recordInfo body: {e}")))?;
        envelope.into_data("recordInfo")?.status()
    }

    async fn wait_for_result(&self, key: &str, task_id: &str) -> StandResult<String> {
        let started = tokio::time::Instant::now();
        while started.elapsed() < self.max_wait {
            tokio::time::sleep(self.poll_interval).await;
            let waited = started.elapsed();

            match self.poll_once(key, task_id).await? {
                TaskStatus::Done(url) => {
                    tracing::info!("kie.ai task {task_id} finished after {waited:?}");
                    return Ok(url);
                }
                TaskStatus::Pending(state) => {
                    tracing::debug!("kie.ai task {task_id} is {state} ({waited:?} elapsed)");
                }
            }
        }

        Err(StandError::provider(
            None,
            format!(
                "Timeout after {}s waiting for task {task_id}",
                self.max_wait.as_secs()
            ),
        ))
    }

    async fn download(&self, url: &str) -> StandResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("image download", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StandError::provider(
                Some(status.as_u16()),
                format!("image download from {url} failed"),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("image download", e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for KieClient {
    async fn generate(&self, request: &GenerationRequest) -> StandResult<GeneratedImage> {
        let key = self.key()?;
        let task_id = self.create_task(key, request).await?;
        let url = self.wait_for_result(key, &task_id).await?;
        let bytes = self.download(&url).await?;
        Ok(GeneratedImage {
            bytes,
            provider_ref: Some(url),
        })
    }
}
