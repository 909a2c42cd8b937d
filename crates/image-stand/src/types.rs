//! Core data types for scoring, artifacts, and errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which comparison produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    Structural,
    Embedding,
    Hybrid,
}

impl ScoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMethod::Structural => "structural",
            ScoreMethod::Embedding => "embedding",
            ScoreMethod::Hybrid => "hybrid",
        }
    }

    /// Whether this method needs model inference.
    pub fn needs_embedding(&self) -> bool {
        !matches!(self, ScoreMethod::Structural)
    }
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreMethod {
    type Err = StandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structural" | "ssim" => Ok(ScoreMethod::Structural),
            "embedding" | "embeddings" => Ok(ScoreMethod::Embedding),
            "hybrid" => Ok(ScoreMethod::Hybrid),
            other => Err(StandError::InvalidInput(format!(
                "Unknown comparison method: {other}. Use structural, embedding, or hybrid."
            ))),
        }
    }
}

/// A similarity scalar in [0, 1] tagged with the method that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    value: f32,
    method: ScoreMethod,
}

impl RawScore {
    /// Build a score, clamping into [0, 1]. NaN maps to 0.
    pub fn new(value: f32, method: ScoreMethod) -> Self {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        Self { value, method }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn method(&self) -> ScoreMethod {
        self.method
    }
}

/// A feature vector plus the id of the extractor version that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub extractor: String,
}

impl Embedding {
    pub fn new(values: Vec<f32>, extractor: impl Into<String>) -> Self {
        Self {
            values,
            extractor: extractor.into(),
        }
    }

    pub fn dims(&self) -> usize {
        self.values.len()
    }
}

/// Calibrated outcome of one `compare` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub method: ScoreMethod,
    /// Raw score before calibration.
    pub raw_score: f32,
    /// Raw score after the sensitivity exponent.
    pub adjusted_score: f32,
    /// Final calibrated score in [0, 1].
    pub score: f32,
    /// `score` expressed as 0-100.
    pub percentage: f32,
    pub sensitivity: f32,
}

/// Opaque identifier of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        ArtifactId(s.to_string())
    }
}

/// What a round keeps about an artifact once its bytes are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: ArtifactId,
    /// Provider-side reference (e.g. result URL) used when editing.
    pub provider_ref: Option<String>,
    /// Retrieval path or location reported by the store.
    pub location: String,
}

/// Errors that can occur in the scoring engine and round workflow.
#[derive(thiserror::Error, Debug)]
pub enum StandError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Feature extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    /// A loaded extractor failed on one input.
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Embedding mismatch: cannot compare {left} with {right}")]
    EmbeddingMismatch { left: String, right: String },

    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    #[error("Invalid thresholds: min {min} and max {max} must satisfy 0 <= min < max <= 1")]
    InvalidThresholds { min: f32, max: f32 },

    #[error("Invalid sensitivity: {0} is outside (0, 10]")]
    InvalidSensitivity(f32),

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Unsupported MIME type: {0}")]
    UnsupportedMimeType(String),

    #[error("Provider error: {message}")]
    Provider { status: Option<u16>, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid round transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StandError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        StandError::Provider {
            status,
            message: message.into(),
        }
    }

    /// Whether repeating the same call in this process could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StandError::Provider { .. }
                | StandError::Storage(_)
                | StandError::Decode(_)
                | StandError::Inference(_)
        )
    }
}

impl From<image::ImageError> for StandError {
    fn from(e: image::ImageError) -> Self {
        StandError::Decode(e.to_string())
    }
}

/// Convenience result type.
pub type StandResult<T> = Result<T, StandError>;
