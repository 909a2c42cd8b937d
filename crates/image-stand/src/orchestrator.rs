//! Drives rounds through generation, storage, and comparison.
//!
//! The orchestrator holds no per-round state. Everything a round needs
//! between calls lives in its [`Round`] record.

use std::sync::Arc;

use crate::calibration::Sensitivity;
use crate::collaborators::{
    AudioMime, GenerationOptions, GenerationRequest, ImageGenerator, Transcriber,
};
use crate::decode::decode_image;
use crate::engine::ScoringEngine;
use crate::round::{Round, RoundEvent, RoundState};
use crate::storage::ArtifactStore;
use crate::types::{ArtifactId, ArtifactRef, Comparison, ScoreMethod, StandError, StandResult};

/// Where a round's prompt comes from.
#[derive(Debug, Clone)]
pub enum PromptInput {
    Text(String),
    Audio { bytes: Vec<u8>, mime: AudioMime },
}

pub struct RoundOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn ArtifactStore>,
    engine: ScoringEngine,
}

impl RoundOrchestrator {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn ArtifactStore>,
        engine: ScoringEngine,
    ) -> Self {
        Self {
            generator,
            transcriber,
            store,
            engine,
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Open a round against an encoded reference image.
    pub fn start_round(&self, reference: &[u8], options: GenerationOptions) -> StandResult<Round> {
        let reference = decode_image(reference)?;
        let round = Round::new(reference, options);
        tracing::info!("Round {} started", round.id);
        Ok(round)
    }

    /// First generation of a round.
    ///
    /// A blank prompt is rejected before the generator is called and leaves
    /// the round untouched. Collaborator failures leave it `Failed`.
    pub async fn run_round(&self, round: &mut Round, input: PromptInput) -> StandResult<ArtifactRef> {
        if *round.state() != RoundState::CollectingInput {
            return Err(StandError::InvalidTransition(format!(
                "round {} already ran; use edit",
                round.id
            )));
        }
        let prompt = self.collect_prompt(round, input).await?;
        self.generate_and_store(round, prompt, None).await
    }

    /// Generate a new artifact from a prior one in the same round.
    ///
    /// `prior` defaults to the latest artifact.
    pub async fn edit_round(
        &self,
        round: &mut Round,
        input: PromptInput,
        prior: Option<&ArtifactId>,
    ) -> StandResult<ArtifactRef> {
        if !matches!(round.state(), RoundState::Stored | RoundState::Reported) {
            return Err(StandError::InvalidTransition(format!(
                "cannot edit a round in state {}",
                round.state().name()
            )));
        }

        let prior = match prior {
            Some(id) => round.artifacts.iter().find(|a| &a.id == id),
            None => round.latest_artifact(),
        }
        .ok_or_else(|| StandError::ArtifactNotFound(format!("no such artifact in round {}", round.id)))?;
        let reference = prior.provider_ref.clone().ok_or_else(|| {
            StandError::InvalidInput(format!("artifact {} has no provider reference", prior.id))
        })?;

        let prompt = self.collect_prompt(round, input).await?;
        round.apply(RoundEvent::BeginEdit)?;
        self.generate_and_store(round, prompt, Some(reference)).await
    }

    /// Score the latest artifact against the reference.
    ///
    /// CPU bound and blocking; async callers should run it off the runtime
    /// workers. Storage failures fail the round. Any other error restores
    /// the state the round was resting in, so comparison can be retried.
    pub fn compare_round(
        &self,
        round: &mut Round,
        method: ScoreMethod,
        sensitivity: Sensitivity,
    ) -> StandResult<Comparison> {
        round.apply(RoundEvent::BeginCompare)?;

        let id = match round.latest_artifact() {
            Some(a) => a.id.clone(),
            None => {
                round.apply(RoundEvent::CompareAborted)?;
                return Err(StandError::ArtifactNotFound(format!(
                    "round {} has no artifact",
                    round.id
                )));
            }
        };

        let bytes = match self.store.retrieve(&id) {
            Ok(bytes) => bytes,
            Err(e) => {
                round.apply(RoundEvent::Fail(e.to_string()))?;
                return Err(e);
            }
        };

        let result = decode_image(&bytes)
            .and_then(|candidate| {
                self.engine
                    .compare_images(&round.reference, &candidate, method, sensitivity)
            });

        match result {
            Ok(comparison) => {
                round.comparison = Some(comparison);
                round.apply(RoundEvent::Compared)?;
                tracing::info!(
                    "Round {} scored {:.1}% with {method}",
                    round.id,
                    comparison.percentage
                );
                Ok(comparison)
            }
            Err(e) => {
                tracing::warn!("Round {} comparison aborted: {e}", round.id);
                round.apply(RoundEvent::CompareAborted)?;
                Err(e)
            }
        }
    }

    async fn collect_prompt(&self, round: &mut Round, input: PromptInput) -> StandResult<String> {
        let text = match input {
            PromptInput::Text(text) => text,
            PromptInput::Audio { bytes, mime } => {
                tracing::info!("Round {}: transcribing {} bytes of {mime}", round.id, bytes.len());
                match self.transcriber.transcribe(&bytes, mime).await {
                    Ok(text) => text,
                    Err(e) => {
                        round.apply(RoundEvent::Fail(e.to_string()))?;
                        return Err(e);
                    }
                }
            }
        };

        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(StandError::EmptyPrompt);
        }
        Ok(prompt.to_string())
    }

    async fn generate_and_store(
        &self,
        round: &mut Round,
        prompt: String,
        reference: Option<String>,
    ) -> StandResult<ArtifactRef> {
        round.apply(RoundEvent::PromptReady)?;

        let request = GenerationRequest {
            prompt: prompt.clone(),
            reference,
            options: round.options,
        };
        let generated = match self.generator.generate(&request).await {
            Ok(g) => g,
            Err(e) => {
                round.apply(RoundEvent::Fail(e.to_string()))?;
                return Err(e);
            }
        };
        round.apply(RoundEvent::Generated)?;

        let id = match self.store.store(&generated.bytes) {
            Ok(id) => id,
            Err(e) => {
                round.apply(RoundEvent::Fail(e.to_string()))?;
                return Err(e);
            }
        };

        let artifact = ArtifactRef {
            location: self.store.location(&id),
            id,
            provider_ref: generated.provider_ref,
        };
        round.artifacts.push(artifact.clone());
        round.prompt = Some(prompt);
        round.comparison = None;
        round.apply(RoundEvent::Stored)?;
        Ok(artifact)
    }
}
