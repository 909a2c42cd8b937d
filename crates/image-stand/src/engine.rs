//! Scoring engine: decode, score, and calibrate in one call.

use image::DynamicImage;

use crate::calibration::{Calibration, Sensitivity};
use crate::decode::decode_image;
use crate::scorer::Scorer;
use crate::types::{Comparison, ScoreMethod, StandResult};

/// Immutable scoring configuration shared by every comparison.
///
/// Sensitivity is not part of the engine; callers pass it per call,
/// resolving the process-wide default at the boundary.
#[derive(Clone)]
pub struct ScoringEngine {
    scorer: Scorer,
    calibration: Calibration,
}

impl ScoringEngine {
    pub fn new(scorer: Scorer, calibration: Calibration) -> Self {
        Self {
            scorer,
            calibration,
        }
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Compare two encoded images.
    ///
    /// A decode failure on either side aborts only this call.
    pub fn compare(
        &self,
        reference: &[u8],
        candidate: &[u8],
        method: ScoreMethod,
        sensitivity: Sensitivity,
    ) -> StandResult<Comparison> {
        let reference = decode_image(reference)?;
        let candidate = decode_image(candidate)?;
        self.compare_images(&reference, &candidate, method, sensitivity)
    }

    /// Compare two decoded images.
    pub fn compare_images(
        &self,
        reference: &DynamicImage,
        candidate: &DynamicImage,
        method: ScoreMethod,
        sensitivity: Sensitivity,
    ) -> StandResult<Comparison> {
        let raw = self.scorer.score(reference, candidate, method)?;
        let comparison = self.calibration.calibrate(raw, sensitivity);
        tracing::debug!(
            "Compared with {method}: raw {:.4}, adjusted {:.4}, {:.2}% (sensitivity {})",
            comparison.raw_score,
            comparison.adjusted_score,
            comparison.percentage,
            comparison.sensitivity
        );
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StandError;
    use image::{Rgb, RgbImage};

    fn solid_png(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)));
        let mut buf = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
            .unwrap();
        buf
    }

    fn engine() -> ScoringEngine {
        ScoringEngine::new(Scorer::structural_only(), Calibration::default())
    }

    #[test]
    fn test_identical_red_scores_one_hundred() {
        let red = solid_png(100, 100, [255, 0, 0]);
        let c = engine()
            .compare(&red, &red, ScoreMethod::Structural, Sensitivity::NEUTRAL)
            .unwrap();
        assert!((c.raw_score - 1.0).abs() < 1e-5);
        assert!((c.percentage - 100.0).abs() < 1e-2);
        assert_eq!(c.method, ScoreMethod::Structural);
    }

    #[test]
    fn test_red_vs_blue_at_most_ten_percent() {
        let red = solid_png(100, 100, [255, 0, 0]);
        let blue = solid_png(100, 100, [0, 0, 255]);
        let c = engine()
            .compare(&red, &blue, ScoreMethod::Structural, Sensitivity::NEUTRAL)
            .unwrap();
        assert!(c.raw_score < 0.05, "raw {}", c.raw_score);
        assert!(c.percentage <= 10.0, "percentage {}", c.percentage);
    }

    #[test]
    fn test_bad_bytes_abort_compare() {
        let red = solid_png(10, 10, [255, 0, 0]);
        let err = engine()
            .compare(&red, b"garbage", ScoreMethod::Structural, Sensitivity::NEUTRAL)
            .unwrap_err();
        assert!(matches!(err, StandError::Decode(_)));
    }

    #[test]
    fn test_stricter_sensitivity_lowers_score() {
        let a = solid_png(40, 40, [200, 120, 40]);
        let b = solid_png(40, 40, [180, 130, 60]);
        let e = engine();
        let lenient = e
            .compare(&a, &b, ScoreMethod::Structural, Sensitivity::new(0.5).unwrap())
            .unwrap();
        let strict = e
            .compare(&a, &b, ScoreMethod::Structural, Sensitivity::new(10.0).unwrap())
            .unwrap();
        assert_eq!(lenient.raw_score, strict.raw_score);
        assert!(strict.percentage < lenient.percentage);
    }
}
