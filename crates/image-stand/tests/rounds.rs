//! Round workflow against stub collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use image_stand::{
    ArtifactId, ArtifactStore, AudioMime, Calibration, Embedding, FeatureExtractor,
    GeneratedImage, GenerationOptions, GenerationRequest, HistogramExtractor, HybridWeights,
    ImageGenerator, MemoryArtifactStore, PromptInput, RoundOrchestrator, RoundState, ScoreMethod,
    Scorer, ScoringEngine, Sensitivity, SensitivitySetting, StandError, StandResult,
    StructuralComparator, Transcriber,
};

fn solid_png(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)));
    let mut buf = Vec::new();
    img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

/// Returns a fixed image, or fails when `fail` is set. Records requests.
struct StubGenerator {
    image: Vec<u8>,
    fail: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    fn ok(image: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            image,
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            image: Vec::new(),
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> StandResult<GeneratedImage> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail {
            return Err(StandError::provider(Some(500), "upstream exploded"));
        }
        Ok(GeneratedImage {
            bytes: self.image.clone(),
            provider_ref: Some(format!("https://cdn.example/result-{n}.png")),
        })
    }
}

struct StubTranscriber {
    text: String,
    calls: AtomicUsize,
}

impl StubTranscriber {
    fn says(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime: AudioMime) -> StandResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// A store whose writes always fail.
struct BrokenStore;

impl ArtifactStore for BrokenStore {
    fn store(&self, _bytes: &[u8]) -> StandResult<ArtifactId> {
        Err(StandError::Storage("disk full".into()))
    }

    fn retrieve(&self, id: &ArtifactId) -> StandResult<Vec<u8>> {
        Err(StandError::ArtifactNotFound(id.to_string()))
    }

    fn location(&self, id: &ArtifactId) -> String {
        id.to_string()
    }

    fn list(&self) -> StandResult<Vec<ArtifactId>> {
        Ok(Vec::new())
    }

    fn delete(&self, id: &ArtifactId) -> StandResult<()> {
        Err(StandError::ArtifactNotFound(id.to_string()))
    }
}

fn engine() -> ScoringEngine {
    ScoringEngine::new(Scorer::structural_only(), Calibration::default())
}

fn orchestrator(
    generator: Arc<StubGenerator>,
    transcriber: Arc<StubTranscriber>,
    store: Arc<dyn ArtifactStore>,
) -> RoundOrchestrator {
    RoundOrchestrator::new(generator, transcriber, store, engine())
}

#[tokio::test]
async fn test_full_round_reports_score() {
    let red = solid_png(100, 100, [255, 0, 0]);
    let generator = StubGenerator::ok(red.clone());
    let store = Arc::new(MemoryArtifactStore::new());
    let orch = orchestrator(generator.clone(), StubTranscriber::says(""), store.clone());

    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    let artifact = orch
        .run_round(&mut round, PromptInput::Text("  a red square ".into()))
        .await
        .unwrap();
    assert_eq!(*round.state(), RoundState::Stored);
    assert_eq!(round.prompt.as_deref(), Some("a red square"));
    assert_eq!(store.len(), 1);
    assert!(artifact.location.starts_with("memory://"));

    let comparison = orch
        .compare_round(&mut round, ScoreMethod::Structural, Sensitivity::NEUTRAL)
        .unwrap();
    assert!((comparison.percentage - 100.0).abs() < 1e-2);
    assert_eq!(*round.state(), RoundState::Reported);

    // Comparing again is allowed.
    orch.compare_round(&mut round, ScoreMethod::Structural, Sensitivity::NEUTRAL)
        .unwrap();
    assert_eq!(*round.state(), RoundState::Reported);
}

#[tokio::test]
async fn test_blank_transcription_never_calls_generator() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let generator = StubGenerator::ok(red.clone());
    let transcriber = StubTranscriber::says("   \n ");
    let store = Arc::new(MemoryArtifactStore::new());
    let orch = orchestrator(generator.clone(), transcriber.clone(), store.clone());

    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    let err = orch
        .run_round(
            &mut round,
            PromptInput::Audio {
                bytes: vec![1, 2, 3],
                mime: AudioMime::Webm,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StandError::EmptyPrompt));
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.calls(), 0);
    assert_eq!(*round.state(), RoundState::CollectingInput);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_provider_failure_fails_round_without_artifact() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let generator = StubGenerator::failing();
    let store = Arc::new(MemoryArtifactStore::new());
    let orch = orchestrator(generator.clone(), StubTranscriber::says(""), store.clone());

    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    let err = orch
        .run_round(&mut round, PromptInput::Text("a cat".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, StandError::Provider { status: Some(500), .. }));
    assert!(round.state().is_failed());
    assert!(round.artifacts.is_empty());
    assert!(store.is_empty());
    assert_eq!(round.summary().failure.as_deref(), Some("Provider error: upstream exploded"));

    // A failed round accepts nothing else.
    let again = orch
        .compare_round(&mut round, ScoreMethod::Structural, Sensitivity::NEUTRAL);
    assert!(matches!(again, Err(StandError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_storage_failure_is_fatal() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let orch = orchestrator(
        StubGenerator::ok(red.clone()),
        StubTranscriber::says(""),
        Arc::new(BrokenStore),
    );
    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    let err = orch
        .run_round(&mut round, PromptInput::Text("a dog".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, StandError::Storage(_)));
    assert!(round.state().is_failed());
    assert!(round.artifacts.is_empty());
}

#[tokio::test]
async fn test_edit_reuses_reference_and_chains_artifacts() {
    let red = solid_png(32, 32, [255, 0, 0]);
    let generator = StubGenerator::ok(solid_png(16, 16, [250, 5, 5]));
    let store = Arc::new(MemoryArtifactStore::new());
    let orch = orchestrator(generator.clone(), StubTranscriber::says("make it redder"), store.clone());

    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    let first = orch
        .run_round(&mut round, PromptInput::Text("a square".into()))
        .await
        .unwrap();
    orch.compare_round(&mut round, ScoreMethod::Structural, Sensitivity::NEUTRAL)
        .unwrap();

    let second = orch
        .edit_round(
            &mut round,
            PromptInput::Audio {
                bytes: vec![0; 8],
                mime: AudioMime::Wav,
            },
            None,
        )
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(round.artifacts.len(), 2);
    assert_eq!(*round.state(), RoundState::Stored);
    assert!(round.comparison.is_none());
    assert_eq!(round.prompt.as_deref(), Some("make it redder"));

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].reference, None);
    assert_eq!(requests[1].reference, first.provider_ref);
}

#[tokio::test]
async fn test_compare_decode_failure_restores_state() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let generator = StubGenerator::ok(b"definitely not an image".to_vec());
    let orch = orchestrator(
        generator,
        StubTranscriber::says(""),
        Arc::new(MemoryArtifactStore::new()),
    );
    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    orch.run_round(&mut round, PromptInput::Text("noise".into()))
        .await
        .unwrap();

    let err = orch
        .compare_round(&mut round, ScoreMethod::Structural, Sensitivity::NEUTRAL)
        .unwrap_err();
    assert!(matches!(err, StandError::Decode(_)));
    assert_eq!(*round.state(), RoundState::Stored);
}

#[tokio::test]
async fn test_embedding_without_extractor_keeps_round_usable() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let orch = orchestrator(
        StubGenerator::ok(red.clone()),
        StubTranscriber::says(""),
        Arc::new(MemoryArtifactStore::new()),
    );
    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    orch.run_round(&mut round, PromptInput::Text("red".into()))
        .await
        .unwrap();

    let err = orch
        .compare_round(&mut round, ScoreMethod::Hybrid, Sensitivity::NEUTRAL)
        .unwrap_err();
    assert!(matches!(err, StandError::ExtractorUnavailable(_)));
    assert_eq!(*round.state(), RoundState::Stored);
}

/// Fails its first `fail_first` extractions, then behaves like the histogram.
struct FlakyExtractor {
    fail_first: usize,
    calls: AtomicUsize,
}

impl FeatureExtractor for FlakyExtractor {
    fn version(&self) -> &str {
        "rgb-histogram-4"
    }

    fn dims(&self) -> usize {
        64
    }

    fn extract(&self, img: &DynamicImage) -> StandResult<Embedding> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            return Err(StandError::Inference("runtime hiccup".into()));
        }
        HistogramExtractor.extract(img)
    }
}

#[tokio::test]
async fn test_inference_failure_only_aborts_the_comparison() {
    let red = solid_png(20, 20, [255, 0, 0]);
    let extractor: Arc<dyn FeatureExtractor> = Arc::new(FlakyExtractor {
        fail_first: 1,
        calls: AtomicUsize::new(0),
    });
    let scorer = Scorer::new(
        StructuralComparator::default(),
        Some(extractor),
        HybridWeights::default(),
    );
    let orch = RoundOrchestrator::new(
        StubGenerator::ok(red.clone()),
        StubTranscriber::says(""),
        Arc::new(MemoryArtifactStore::new()),
        ScoringEngine::new(scorer, Calibration::default()),
    );
    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    orch.run_round(&mut round, PromptInput::Text("red".into()))
        .await
        .unwrap();

    let err = orch
        .compare_round(&mut round, ScoreMethod::Embedding, Sensitivity::NEUTRAL)
        .unwrap_err();
    assert!(matches!(err, StandError::Inference(_)));
    assert!(err.is_retryable());
    assert_eq!(*round.state(), RoundState::Stored);

    let comparison = orch
        .compare_round(&mut round, ScoreMethod::Embedding, Sensitivity::NEUTRAL)
        .unwrap();
    assert!(comparison.percentage > 99.0);
    assert_eq!(*round.state(), RoundState::Reported);
}

#[tokio::test]
async fn test_sensitivity_change_applies_to_later_comparison() {
    let red = solid_png(40, 40, [255, 0, 0]);
    let near = solid_png(40, 40, [230, 30, 20]);
    let orch = orchestrator(
        StubGenerator::ok(near),
        StubTranscriber::says(""),
        Arc::new(MemoryArtifactStore::new()),
    );
    let setting = SensitivitySetting::default();

    let mut round = orch.start_round(&red, GenerationOptions::default()).unwrap();
    orch.run_round(&mut round, PromptInput::Text("close".into()))
        .await
        .unwrap();
    let lenient = orch
        .compare_round(&mut round, ScoreMethod::Structural, setting.get())
        .unwrap();

    assert!(setting.set(-1.0).is_err());
    assert_eq!(setting.get(), Sensitivity::NEUTRAL);

    setting.set(8.0).unwrap();
    let strict = orch
        .compare_round(&mut round, ScoreMethod::Structural, setting.get())
        .unwrap();
    assert_eq!(lenient.raw_score, strict.raw_score);
    assert!(strict.percentage <= lenient.percentage);
    assert_eq!(strict.sensitivity, 8.0);
}

#[tokio::test]
async fn test_bad_reference_rejected_at_start() {
    let orch = orchestrator(
        StubGenerator::ok(Vec::new()),
        StubTranscriber::says(""),
        Arc::new(MemoryArtifactStore::new()),
    );
    assert!(matches!(
        orch.start_round(b"nope", GenerationOptions::default()),
        Err(StandError::Decode(_))
    ));
}
