//! Configuration loading and resolution.
//!
//! Precedence everywhere: explicit flag, then environment, then default.
//! Scoring values are validated here once, at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use image_stand::calibration::{DEFAULT_MAX_THRESHOLD, DEFAULT_MIN_THRESHOLD};
use image_stand::embedding::default_model_path;
use image_stand::scorer::{DEFAULT_EMBEDDING_WEIGHT, DEFAULT_STRUCTURAL_WEIGHT};
use image_stand::{
    Calibration, ClipExtractor, FeatureExtractor, HistogramExtractor, HybridWeights, ScoreMethod,
    Scorer, ScoringEngine, Sensitivity, StandError, StandResult, StructuralComparator, Thresholds,
};

pub const ENV_IMAGES_DIR: &str = "IMAGES_DIR";
pub const ENV_MODEL: &str = "IMAGE_STAND_MODEL";
pub const ENV_KIE_API_KEY: &str = "KIE_API_KEY";
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

/// Which feature extractor backs the embedding and hybrid methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// CLIP ViT-B/32 through ONNX Runtime.
    #[default]
    Clip,
    /// Colour histogram; needs no model file.
    Histogram,
}

/// Resolve the artifact directory.
pub fn resolve_images_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }

    if let Ok(env_dir) = std::env::var(ENV_IMAGES_DIR) {
        if !env_dir.trim().is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".image-stand").join("images")
}

/// Resolve the CLIP model file.
pub fn resolve_model_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var(ENV_MODEL).ok().map(PathBuf::from))
        .unwrap_or_else(default_model_path)
}

/// Show the first four characters of a key, or that it is unset.
pub fn mask_key(key: Option<&str>) -> String {
    match key {
        Some(k) if k.chars().count() > 8 => format!("{}…", k.chars().take(4).collect::<String>()),
        Some(_) => "set".to_string(),
        None => "not set".to_string(),
    }
}

/// Validated scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringSettings {
    pub method: ScoreMethod,
    pub sensitivity: Sensitivity,
    pub weights: HybridWeights,
    pub calibration: Calibration,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            method: ScoreMethod::Hybrid,
            sensitivity: Sensitivity::NEUTRAL,
            weights: HybridWeights::default(),
            calibration: Calibration::default(),
        }
    }
}

impl ScoringSettings {
    pub fn from_env() -> StandResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StandResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let method = match get("SIMILARITY_MODEL") {
            Some(v) => v.parse()?,
            None => ScoreMethod::Hybrid,
        };
        let sensitivity = Sensitivity::new(number(&get, "SIMILARITY_SENSITIVITY", 1.0)?)?;
        let weights = HybridWeights::new(
            number(&get, "SIMILARITY_EMBEDDING_WEIGHT", DEFAULT_EMBEDDING_WEIGHT)?,
            number(&get, "SIMILARITY_SSIM_WEIGHT", DEFAULT_STRUCTURAL_WEIGHT)?,
        )?;
        let thresholds = Thresholds::new(
            number(&get, "SIMILARITY_MIN_THRESHOLD", DEFAULT_MIN_THRESHOLD)?,
            number(&get, "SIMILARITY_MAX_THRESHOLD", DEFAULT_MAX_THRESHOLD)?,
        )?;
        let rescale = match get("SIMILARITY_USE_NONLINEAR") {
            Some(v) => flag("SIMILARITY_USE_NONLINEAR", &v)?,
            None => true,
        };

        Ok(Self {
            method,
            sensitivity,
            weights,
            calibration: Calibration::new(thresholds, rescale),
        })
    }

    /// Scoring engine over the given extractor.
    pub fn engine(&self, extractor: Option<Arc<dyn FeatureExtractor>>) -> ScoringEngine {
        let scorer = Scorer::new(StructuralComparator::default(), extractor, self.weights);
        ScoringEngine::new(scorer, self.calibration)
    }
}

fn number(get: &impl Fn(&str) -> Option<String>, key: &str, default: f32) -> StandResult<f32> {
    match get(key) {
        Some(v) => f32::from_str(v.trim())
            .map_err(|_| StandError::InvalidInput(format!("{key}={v} is not a number"))),
        None => Ok(default),
    }
}

fn flag(key: &str, value: &str) -> StandResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StandError::InvalidInput(format!("{key}={value} is not a boolean"))),
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub images_dir: PathBuf,
    pub model_path: PathBuf,
    pub extractor: ExtractorKind,
    pub kie_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub scoring: ScoringSettings,
}

impl ServerConfig {
    pub fn resolve(
        images_dir: Option<&str>,
        model: Option<&str>,
        extractor: ExtractorKind,
    ) -> StandResult<Self> {
        let key = |name: &str| std::env::var(name).ok().filter(|k| !k.trim().is_empty());
        Ok(Self {
            images_dir: resolve_images_dir(images_dir),
            model_path: resolve_model_path(model),
            extractor,
            kie_api_key: key(ENV_KIE_API_KEY),
            openrouter_api_key: key(ENV_OPENROUTER_API_KEY),
            scoring: ScoringSettings::from_env()?,
        })
    }

    /// Load the configured extractor. Failure here is fatal for the process.
    pub fn load_extractor(&self) -> StandResult<Arc<dyn FeatureExtractor>> {
        match self.extractor {
            ExtractorKind::Clip => Ok(Arc::new(ClipExtractor::load(&self.model_path)?)),
            ExtractorKind::Histogram => {
                tracing::info!("Using histogram feature extractor");
                Ok(Arc::new(HistogramExtractor))
            }
        }
    }
}
