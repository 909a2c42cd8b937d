//! Round record and its state machine.
//!
//! ```text
//! CollectingInput ─▶ Generating ─▶ Storing ─▶ Stored ─▶ Comparing ─▶ Reported
//!                        ▲                      │  ▲        │            │
//!                        │                      │  └────────┘ (abort)    │
//!                        └────── Editing ◀──────┴────────────────────────┘
//! ```
//!
//! Any live state moves to the terminal `Failed` state when a collaborator
//! fails.

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use uuid::Uuid;

use crate::collaborators::GenerationOptions;
use crate::types::{ArtifactRef, Comparison, StandError, StandResult};

/// States a round can rest in between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resting {
    Stored,
    Reported,
}

impl From<Resting> for RoundState {
    fn from(r: Resting) -> Self {
        match r {
            Resting::Stored => RoundState::Stored,
            Resting::Reported => RoundState::Reported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundState {
    CollectingInput,
    Generating,
    Storing,
    /// An artifact is stored and can be compared or edited.
    Stored,
    /// A comparison is running; `resume` is restored if it fails.
    Comparing { resume: Resting },
    Reported,
    Editing,
    Failed { message: String },
}

impl RoundState {
    pub fn name(&self) -> &'static str {
        match self {
            RoundState::CollectingInput => "collecting_input",
            RoundState::Generating => "generating",
            RoundState::Storing => "storing",
            RoundState::Stored => "stored",
            RoundState::Comparing { .. } => "comparing",
            RoundState::Reported => "reported",
            RoundState::Editing => "editing",
            RoundState::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RoundState::Failed { .. })
    }

    fn resting(&self) -> Option<Resting> {
        match self {
            RoundState::Stored => Some(Resting::Stored),
            RoundState::Reported => Some(Resting::Reported),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// A non-blank prompt is ready; call the generator.
    PromptReady,
    /// The generator returned bytes.
    Generated,
    /// The artifact is persisted.
    Stored,
    BeginCompare,
    Compared,
    /// Comparison failed without involving a collaborator.
    CompareAborted,
    BeginEdit,
    /// A collaborator failed.
    Fail(String),
}

impl RoundEvent {
    fn name(&self) -> &'static str {
        match self {
            RoundEvent::PromptReady => "prompt_ready",
            RoundEvent::Generated => "generated",
            RoundEvent::Stored => "stored",
            RoundEvent::BeginCompare => "begin_compare",
            RoundEvent::Compared => "compared",
            RoundEvent::CompareAborted => "compare_aborted",
            RoundEvent::BeginEdit => "begin_edit",
            RoundEvent::Fail(_) => "fail",
        }
    }
}

/// Exhaustive transition function.
pub fn transition(state: &RoundState, event: &RoundEvent) -> StandResult<RoundState> {
    use RoundEvent as E;
    use RoundState as S;

    let next = match (state, event) {
        (S::CollectingInput | S::Editing, E::PromptReady) => S::Generating,
        (S::Generating, E::Generated) => S::Storing,
        (S::Storing, E::Stored) => S::Stored,
        (S::Stored | S::Reported, E::BeginCompare) => S::Comparing {
            resume: state.resting().unwrap_or(Resting::Stored),
        },
        (S::Comparing { .. }, E::Compared) => S::Reported,
        (S::Comparing { resume }, E::CompareAborted) => (*resume).into(),
        (S::Stored | S::Reported, E::BeginEdit) => S::Editing,
        (S::Failed { .. }, _) => {
            return Err(StandError::InvalidTransition(format!(
                "round already failed, cannot accept {}",
                event.name()
            )))
        }
        (_, E::Fail(message)) => S::Failed {
            message: message.clone(),
        },
        _ => {
            return Err(StandError::InvalidTransition(format!(
                "{} does not accept {}",
                state.name(),
                event.name()
            )))
        }
    };
    Ok(next)
}

/// One game round: a reference image and the artifacts generated against it.
pub struct Round {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reference: DynamicImage,
    pub options: GenerationOptions,
    state: RoundState,
    /// Prompt of the most recent generation.
    pub prompt: Option<String>,
    /// Every artifact produced by this round, oldest first.
    pub artifacts: Vec<ArtifactRef>,
    pub comparison: Option<Comparison>,
}

impl Round {
    pub fn new(reference: DynamicImage, options: GenerationOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            reference,
            options,
            state: RoundState::CollectingInput,
            prompt: None,
            artifacts: Vec::new(),
            comparison: None,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn latest_artifact(&self) -> Option<&ArtifactRef> {
        self.artifacts.last()
    }

    /// Apply an event, logging the transition.
    pub fn apply(&mut self, event: RoundEvent) -> StandResult<&RoundState> {
        let next = transition(&self.state, &event)?;
        tracing::info!(
            "Round {}: {} -> {}",
            self.id,
            self.state.name(),
            next.name()
        );
        self.state = next;
        Ok(&self.state)
    }

    pub fn summary(&self) -> RoundSummary {
        let (width, height) = self.reference.dimensions();
        RoundSummary {
            id: self.id,
            created_at: self.created_at,
            state: self.state.name(),
            prompt: self.prompt.clone(),
            reference_width: width,
            reference_height: height,
            options: self.options,
            artifacts: self.artifacts.clone(),
            comparison: self.comparison,
            failure: match &self.state {
                RoundState::Failed { message } => Some(message.clone()),
                _ => None,
            },
        }
    }
}

/// Serializable view of a round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: &'static str,
    pub prompt: Option<String>,
    pub reference_width: u32,
    pub reference_height: u32,
    pub options: GenerationOptions,
    pub artifacts: Vec<ArtifactRef>,
    pub comparison: Option<Comparison>,
    pub failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(state: RoundState, event: RoundEvent) -> RoundState {
        transition(&state, &event).unwrap()
    }

    #[test]
    fn test_happy_path() {
        let s = ok(RoundState::CollectingInput, RoundEvent::PromptReady);
        assert_eq!(s, RoundState::Generating);
        let s = ok(s, RoundEvent::Generated);
        assert_eq!(s, RoundState::Storing);
        let s = ok(s, RoundEvent::Stored);
        assert_eq!(s, RoundState::Stored);
        let s = ok(s, RoundEvent::BeginCompare);
        assert_eq!(s, RoundState::Comparing { resume: Resting::Stored });
        let s = ok(s, RoundEvent::Compared);
        assert_eq!(s, RoundState::Reported);
    }

    #[test]
    fn test_edit_loop() {
        let s = ok(RoundState::Reported, RoundEvent::BeginEdit);
        assert_eq!(s, RoundState::Editing);
        assert_eq!(ok(s, RoundEvent::PromptReady), RoundState::Generating);
        assert_eq!(ok(RoundState::Stored, RoundEvent::BeginEdit), RoundState::Editing);
    }

    #[test]
    fn test_compare_abort_restores_resting_state() {
        let from_reported = ok(RoundState::Reported, RoundEvent::BeginCompare);
        assert_eq!(ok(from_reported, RoundEvent::CompareAborted), RoundState::Reported);
        let from_stored = ok(RoundState::Stored, RoundEvent::BeginCompare);
        assert_eq!(ok(from_stored, RoundEvent::CompareAborted), RoundState::Stored);
    }

    #[test]
    fn test_failures() {
        for s in [
            RoundState::Generating,
            RoundState::Storing,
            RoundState::CollectingInput,
            RoundState::Reported,
        ] {
            let next = ok(s, RoundEvent::Fail("boom".into()));
            assert!(next.is_failed());
        }
    }

    #[test]
    fn test_failed_is_terminal() {
        let failed = RoundState::Failed { message: "x".into() };
        for e in [
            RoundEvent::PromptReady,
            RoundEvent::BeginEdit,
            RoundEvent::BeginCompare,
            RoundEvent::Fail("again".into()),
        ] {
            assert!(matches!(
                transition(&failed, &e),
                Err(StandError::InvalidTransition(_))
            ));
        }
    }

    #[test]
    fn test_illegal_moves_rejected() {
        assert!(transition(&RoundState::CollectingInput, &RoundEvent::BeginCompare).is_err());
        assert!(transition(&RoundState::Generating, &RoundEvent::Stored).is_err());
        assert!(transition(&RoundState::Stored, &RoundEvent::PromptReady).is_err());
        assert!(transition(&RoundState::Reported, &RoundEvent::Compared).is_err());
    }

    #[test]
    fn test_summary_reports_failure() {
        let mut round = Round::new(DynamicImage::new_rgb8(8, 6), GenerationOptions::default());
        round.apply(RoundEvent::PromptReady).unwrap();
        round.apply(RoundEvent::Fail("provider said no".into())).unwrap();
        let summary = round.summary();
        assert_eq!(summary.state, "failed");
        assert_eq!(summary.failure.as_deref(), Some("provider said no"));
        assert_eq!((summary.reference_width, summary.reference_height), (8, 6));
        assert!(summary.artifacts.is_empty());
    }
}
