//! image-stand: perceptual similarity scoring and round orchestration for an
//! image-recreation game.

pub mod calibration;
pub mod collaborators;
pub mod decode;
pub mod embedding;
pub mod engine;
pub mod orchestrator;
pub mod round;
pub mod scorer;
pub mod similarity;
pub mod storage;
pub mod structural;
pub mod types;

pub use calibration::{Calibration, Sensitivity, SensitivitySetting, Thresholds};
pub use collaborators::{
    AspectRatio, AudioMime, GeneratedImage, GenerationOptions, GenerationRequest, ImageGenerator,
    OutputFormat, Resolution, Transcriber,
};
pub use decode::{decode_base64_image, decode_image, decode_image_with_mime};
pub use embedding::{ClipExtractor, FeatureExtractor, HistogramExtractor, EMBEDDING_DIM};
pub use engine::ScoringEngine;
pub use orchestrator::{PromptInput, RoundOrchestrator};
pub use round::{Round, RoundEvent, RoundState, RoundSummary};
pub use scorer::{HybridWeights, Scorer};
pub use similarity::cosine_similarity;
pub use storage::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
pub use structural::{structural_similarity, PlaneMode, StructuralComparator};
pub use types::*;
