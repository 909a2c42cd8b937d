//! Server state: scoring engine, default sensitivity, and open rounds.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use image_stand::{
    ArtifactStore, FileArtifactStore, ImageGenerator, Round, RoundOrchestrator, RoundSummary,
    SensitivitySetting, Transcriber,
};

use crate::clients::{KieClient, OpenRouterClient};
use crate::config::{mask_key, ScoringSettings, ServerConfig};
use crate::types::{McpError, McpResult};

/// A round shared between tool calls. Each round is locked on its own so
/// long provider calls in one round never block another.
pub type SharedRound = Arc<Mutex<Round>>;

/// Key status shown on the config resource.
#[derive(Debug, Clone, serde::Serialize)]
pub struct KeyStatus {
    pub kie_api_key: String,
    pub openrouter_api_key: String,
}

/// Owns everything the tools need between calls.
pub struct StandSessionManager {
    orchestrator: Arc<RoundOrchestrator>,
    transcriber: Arc<dyn Transcriber>,
    sensitivity: Arc<SensitivitySetting>,
    settings: ScoringSettings,
    keys: KeyStatus,
    images_dir: Option<PathBuf>,
    rounds: HashMap<Uuid, SharedRound>,
}

impl StandSessionManager {
    /// Build the production server state from resolved configuration.
    ///
    /// Loads the feature extractor and fails if it is unavailable.
    pub fn open(config: &ServerConfig) -> McpResult<Self> {
        let extractor = config.load_extractor()?;
        let engine = config.scoring.engine(Some(extractor));
        let store = FileArtifactStore::open(&config.images_dir)?;

        let generator: Arc<dyn ImageGenerator> =
            Arc::new(KieClient::new(config.kie_api_key.clone()));
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(OpenRouterClient::new(config.openrouter_api_key.clone()));
        if config.kie_api_key.is_none() {
            tracing::warn!("KIE_API_KEY is not set; round generation will fail");
        }

        let orchestrator =
            RoundOrchestrator::new(generator, transcriber.clone(), Arc::new(store), engine);

        let mut manager = Self::new(orchestrator, transcriber, config.scoring);
        manager.keys = KeyStatus {
            kie_api_key: mask_key(config.kie_api_key.as_deref()),
            openrouter_api_key: mask_key(config.openrouter_api_key.as_deref()),
        };
        manager.images_dir = Some(config.images_dir.clone());

        tracing::info!(
            "Server ready. Default method {}, sensitivity {}",
            config.scoring.method,
            config.scoring.sensitivity.value()
        );
        Ok(manager)
    }

    /// Assemble from already-built parts. Used directly by tests.
    pub fn new(
        orchestrator: RoundOrchestrator,
        transcriber: Arc<dyn Transcriber>,
        settings: ScoringSettings,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            transcriber,
            sensitivity: Arc::new(SensitivitySetting::new(settings.sensitivity)),
            settings,
            keys: KeyStatus {
                kie_api_key: mask_key(None),
                openrouter_api_key: mask_key(None),
            },
            images_dir: None,
            rounds: HashMap::new(),
        }
    }

    pub fn orchestrator(&self) -> Arc<RoundOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn transcriber(&self) -> Arc<dyn Transcriber> {
        self.transcriber.clone()
    }

    pub fn store(&self) -> Arc<dyn ArtifactStore> {
        self.orchestrator.store().clone()
    }

    /// The process-wide default sensitivity.
    pub fn sensitivity(&self) -> Arc<SensitivitySetting> {
        self.sensitivity.clone()
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub fn keys(&self) -> &KeyStatus {
        &self.keys
    }

    pub fn images_dir(&self) -> Option<&PathBuf> {
        self.images_dir.as_ref()
    }

    pub fn insert_round(&mut self, round: Round) -> (Uuid, SharedRound) {
        let id = round.id;
        let shared = Arc::new(Mutex::new(round));
        self.rounds.insert(id, shared.clone());
        (id, shared)
    }

    pub fn remove_round(&mut self, id: &Uuid) {
        self.rounds.remove(id);
    }

    pub fn round(&self, id: &str) -> McpResult<SharedRound> {
        let uuid = Uuid::parse_str(id)
            .map_err(|_| McpError::InvalidParams(format!("Invalid round ID: {id}")))?;
        self.rounds
            .get(&uuid)
            .cloned()
            .ok_or_else(|| McpError::RoundNotFound(id.to_string()))
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Summaries of every round, oldest first.
    ///
    /// Rounds busy in another call are skipped.
    pub fn summaries(&self) -> Vec<RoundSummary> {
        let mut out: Vec<RoundSummary> = self
            .rounds
            .values()
            .filter_map(|r| r.try_lock().ok().map(|round| round.summary()))
            .collect();
        out.sort_by_key(|s| s.created_at);
        out
    }
}
