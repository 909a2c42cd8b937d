//! Feature extraction: CLIP embeddings via ONNX Runtime, plus a model-free
//! colour-histogram extractor.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::decode::ensure_non_empty;
use crate::types::{Embedding, StandError, StandResult};

/// Default embedding dimension for CLIP ViT-B/32.
pub const EMBEDDING_DIM: u32 = 512;

/// Version id stamped on CLIP embeddings.
pub const CLIP_EXTRACTOR_VERSION: &str = "clip-vit-b32-onnx";

/// Version id stamped on histogram embeddings.
pub const HISTOGRAM_EXTRACTOR_VERSION: &str = "rgb-histogram-4";

/// Default model directory.
const MODEL_DIR: &str = ".image-stand/models";

/// Default model filename.
const MODEL_FILENAME: &str = "clip-vit-base-patch32-visual.onnx";

/// CLIP image preprocessing constants.
const CLIP_IMAGE_SIZE: u32 = 224;
#[allow(clippy::excessive_precision)]
const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
#[allow(clippy::excessive_precision)]
const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Bins per colour channel for the histogram extractor.
const HISTOGRAM_BINS: usize = 4;

/// Turns a decoded image into a fixed-length embedding.
///
/// Implementations are shared read-only across concurrent rounds, so
/// `extract` takes `&self` and must be safe to call from several threads.
pub trait FeatureExtractor: Send + Sync {
    /// Identifier of this extractor version. Embeddings carrying different
    /// versions are never compared.
    fn version(&self) -> &str;

    /// Output dimension.
    fn dims(&self) -> usize;

    fn extract(&self, img: &DynamicImage) -> StandResult<Embedding>;
}

/// Resolve the default CLIP model location under `$HOME`.
pub fn default_model_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(MODEL_DIR).join(MODEL_FILENAME)
}

/// CLIP ViT-B/32 visual encoder behind an ONNX Runtime session.
pub struct ClipExtractor {
    session: Mutex<Session>,
}

impl ClipExtractor {
    /// Load the model. A missing file or failed session build is fatal for
    /// this process and surfaces as `ExtractorUnavailable`.
    pub fn load(path: &Path) -> StandResult<Self> {
        if !path.exists() {
            return Err(StandError::ExtractorUnavailable(format!(
                "CLIP model not found at {}",
                path.display()
            )));
        }

        tracing::info!("Loading CLIP model from {}", path.display());

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1).map_err(ort::Error::from))
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| {
                StandError::ExtractorUnavailable(format!("Failed to load ONNX model: {e}"))
            })?;

        tracing::info!("CLIP model loaded successfully");
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Resize to 224x224 and normalize with CLIP mean/std into an NCHW tensor.
    fn preprocess(img: &DynamicImage) -> Array4<f32> {
        let resized = img.resize_exact(
            CLIP_IMAGE_SIZE,
            CLIP_IMAGE_SIZE,
            image::imageops::FilterType::Lanczos3,
        );
        let rgb = resized.to_rgb8();

        let mut tensor =
            Array4::<f32>::zeros((1, 3, CLIP_IMAGE_SIZE as usize, CLIP_IMAGE_SIZE as usize));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3usize {
                let val = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (val - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
        tensor
    }
}

impl FeatureExtractor for ClipExtractor {
    fn version(&self) -> &str {
        CLIP_EXTRACTOR_VERSION
    }

    fn dims(&self) -> usize {
        EMBEDDING_DIM as usize
    }

    fn extract(&self, img: &DynamicImage) -> StandResult<Embedding> {
        ensure_non_empty(img)?;

        let input_tensor = Tensor::from_array(Self::preprocess(img)).map_err(|e| {
            StandError::Inference(format!("Failed to create input tensor: {e}"))
        })?;

        // ONNX sessions need exclusive access to run; inference is serialized.
        let mut session = self
            .session
            .lock()
            .map_err(|_| StandError::ExtractorUnavailable("model handle poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| StandError::Inference(format!("ONNX inference failed: {e}")))?;

        let (_shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            StandError::Inference(format!("Failed to extract output: {e}"))
        })?;

        Ok(Embedding::new(l2_normalize(data.to_vec()), CLIP_EXTRACTOR_VERSION))
    }
}

/// Joint RGB histogram, `HISTOGRAM_BINS` per channel, L2-normalized.
///
/// Needs no model weights; deterministic for identical pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramExtractor;

impl FeatureExtractor for HistogramExtractor {
    fn version(&self) -> &str {
        HISTOGRAM_EXTRACTOR_VERSION
    }

    fn dims(&self) -> usize {
        HISTOGRAM_BINS * HISTOGRAM_BINS * HISTOGRAM_BINS
    }

    fn extract(&self, img: &DynamicImage) -> StandResult<Embedding> {
        ensure_non_empty(img)?;

        let mut bins = vec![0.0f32; self.dims()];
        let step = 256 / HISTOGRAM_BINS;
        for pixel in img.to_rgb8().pixels() {
            let r = pixel[0] as usize / step;
            let g = pixel[1] as usize / step;
            let b = pixel[2] as usize / step;
            bins[(r * HISTOGRAM_BINS + g) * HISTOGRAM_BINS + b] += 1.0;
        }

        Ok(Embedding::new(l2_normalize(bins), HISTOGRAM_EXTRACTOR_VERSION))
    }
}

fn l2_normalize(values: Vec<f32>) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.into_iter().map(|x| x / norm).collect()
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(16, 16, image::Rgb([r, g, b])))
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let result = ClipExtractor::load(Path::new("/nonexistent/model.onnx"));
        assert!(matches!(result, Err(StandError::ExtractorUnavailable(_))));
    }

    #[test]
    fn test_histogram_is_deterministic() {
        let extractor = HistogramExtractor;
        let a = extractor.extract(&solid(200, 10, 10)).unwrap();
        let b = extractor.extract(&solid(200, 10, 10)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dims(), 64);
        assert_eq!(a.extractor, HISTOGRAM_EXTRACTOR_VERSION);
    }

    #[test]
    fn test_histogram_is_unit_length() {
        let emb = HistogramExtractor.extract(&solid(1, 2, 3)).unwrap();
        let norm: f32 = emb.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_histogram_rejects_empty_image() {
        let img = DynamicImage::new_rgb8(0, 5);
        assert!(matches!(
            HistogramExtractor.extract(&img),
            Err(StandError::Decode(_))
        ));
    }
}
