//! Hybrid scorer: structural, embedding, or weighted combination.

use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;

use crate::embedding::FeatureExtractor;
use crate::similarity::{cosine_to_unit, embedding_similarity};
use crate::structural::StructuralComparator;
use crate::types::{RawScore, ScoreMethod, StandError, StandResult};

pub const DEFAULT_EMBEDDING_WEIGHT: f32 = 0.7;
pub const DEFAULT_STRUCTURAL_WEIGHT: f32 = 0.3;

/// Independent weights for the hybrid method, each in [0, 1].
///
/// They need not sum to 1; the combined score is clamped afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HybridWeights {
    embedding: f32,
    structural: f32,
}

impl HybridWeights {
    pub fn new(embedding: f32, structural: f32) -> StandResult<Self> {
        for (name, w) in [("embedding", embedding), ("structural", structural)] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(StandError::InvalidWeight(format!(
                    "{name} weight {w} is outside [0, 1]"
                )));
            }
        }
        if embedding == 0.0 && structural == 0.0 {
            return Err(StandError::InvalidWeight(
                "at least one hybrid weight must be positive".to_string(),
            ));
        }
        Ok(Self {
            embedding,
            structural,
        })
    }

    pub fn embedding(&self) -> f32 {
        self.embedding
    }

    pub fn structural(&self) -> f32 {
        self.structural
    }
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            embedding: DEFAULT_EMBEDDING_WEIGHT,
            structural: DEFAULT_STRUCTURAL_WEIGHT,
        }
    }
}

/// Produces raw scores for the three comparison methods.
///
/// The extractor is optional: without one, `structural` still works and
/// the other methods fail with `ExtractorUnavailable`.
#[derive(Clone)]
pub struct Scorer {
    structural: StructuralComparator,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    weights: HybridWeights,
}

impl Scorer {
    pub fn new(
        structural: StructuralComparator,
        extractor: Option<Arc<dyn FeatureExtractor>>,
        weights: HybridWeights,
    ) -> Self {
        Self {
            structural,
            extractor,
            weights,
        }
    }

    /// A scorer that can only run the structural method.
    pub fn structural_only() -> Self {
        Self::new(StructuralComparator::default(), None, HybridWeights::default())
    }

    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    pub fn structural(&self) -> &StructuralComparator {
        &self.structural
    }

    /// Version of the configured extractor, if any.
    pub fn extractor_version(&self) -> Option<&str> {
        self.extractor.as_deref().map(|e| e.version())
    }

    pub fn score(
        &self,
        reference: &DynamicImage,
        candidate: &DynamicImage,
        method: ScoreMethod,
    ) -> StandResult<RawScore> {
        match method {
            ScoreMethod::Structural => self.structural.compare(reference, candidate),
            ScoreMethod::Embedding => {
                let sim = self.embedding_score(reference, candidate)?;
                Ok(RawScore::new(sim, ScoreMethod::Embedding))
            }
            ScoreMethod::Hybrid => {
                let structural = self.structural.compare(reference, candidate)?.value();
                let embedding = self.embedding_score(reference, candidate)?;
                let combined =
                    self.weights.embedding * embedding + self.weights.structural * structural;
                tracing::debug!(
                    "Hybrid score: embedding {embedding:.4} x {}, structural {structural:.4} x {} = {combined:.4}",
                    self.weights.embedding,
                    self.weights.structural
                );
                Ok(RawScore::new(combined, ScoreMethod::Hybrid))
            }
        }
    }

    /// Cosine similarity of the two embeddings, mapped to [0, 1].
    fn embedding_score(&self, a: &DynamicImage, b: &DynamicImage) -> StandResult<f32> {
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            StandError::ExtractorUnavailable("no feature extractor configured".to_string())
        })?;
        let ea = extractor.extract(a)?;
        let eb = extractor.extract(b)?;
        Ok(cosine_to_unit(embedding_similarity(&ea, &eb)?))
    }
}
