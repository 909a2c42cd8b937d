//! Calibration of raw similarity into a user-facing score.
//!
//! Two transforms run in a fixed order on a raw score `r`:
//!
//! 1. sensitivity: `r' = clamp(r, 0, 1) ^ sensitivity`
//! 2. rescale: a three-segment piecewise-linear map through the fixed output
//!    breakpoints 0.10 and 0.60, placed at the configured thresholds.
//!
//! Every configuration value is validated when it is built, never at
//! scoring time.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{Comparison, RawScore, StandError, StandResult};

/// Upper bound (inclusive) for sensitivity.
pub const MAX_SENSITIVITY: f32 = 10.0;

/// Output value at `min_threshold`.
pub const LOW_BREAKPOINT: f32 = 0.10;

/// Output value at `max_threshold`.
pub const HIGH_BREAKPOINT: f32 = 0.60;

pub const DEFAULT_MIN_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MAX_THRESHOLD: f32 = 0.7;

/// Strictness exponent in (0, 10]. 1 is neutral, larger is stricter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Sensitivity(f32);

impl Sensitivity {
    pub const NEUTRAL: Sensitivity = Sensitivity(1.0);

    pub fn new(value: f32) -> StandResult<Self> {
        if value.is_finite() && value > 0.0 && value <= MAX_SENSITIVITY {
            Ok(Self(value))
        } else {
            Err(StandError::InvalidSensitivity(value))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl TryFrom<f32> for Sensitivity {
    type Error = StandError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Sensitivity::new(value)
    }
}

impl From<Sensitivity> for f32 {
    fn from(s: Sensitivity) -> f32 {
        s.0
    }
}

/// Process-scoped default sensitivity.
///
/// Readers see whatever value is current when they calibrate; there is no
/// per-round isolation. Updates are all-or-nothing: a rejected value leaves
/// the stored one untouched.
#[derive(Debug)]
pub struct SensitivitySetting {
    bits: AtomicU32,
}

impl SensitivitySetting {
    pub fn new(initial: Sensitivity) -> Self {
        Self {
            bits: AtomicU32::new(initial.value().to_bits()),
        }
    }

    pub fn get(&self) -> Sensitivity {
        Sensitivity(f32::from_bits(self.bits.load(Ordering::Acquire)))
    }

    /// Validate and store a new value, returning the previous one.
    pub fn set(&self, value: f32) -> StandResult<Sensitivity> {
        let next = Sensitivity::new(value)?;
        let prev = Sensitivity(f32::from_bits(
            self.bits.swap(next.value().to_bits(), Ordering::AcqRel),
        ));
        tracing::info!("Sensitivity changed {} -> {}", prev.value(), next.value());
        Ok(prev)
    }

    /// Use `explicit` when given, otherwise the current default.
    pub fn resolve(&self, explicit: Option<f32>) -> StandResult<Sensitivity> {
        match explicit {
            Some(v) => Sensitivity::new(v),
            None => Ok(self.get()),
        }
    }
}

impl Default for SensitivitySetting {
    fn default() -> Self {
        Self::new(Sensitivity::NEUTRAL)
    }
}

/// Rescale thresholds, `0 <= min < max <= 1`.
///
/// At `min == 0` or `max == 1` the outer segment is empty, and the clamp
/// in [`Calibration::rescale`] keeps it out of reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    min: f32,
    max: f32,
}

impl Thresholds {
    pub fn new(min: f32, max: f32) -> StandResult<Self> {
        let valid = min.is_finite() && max.is_finite() && min >= 0.0 && min < max && max <= 1.0;
        if !valid {
            return Err(StandError::InvalidThresholds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_THRESHOLD,
            max: DEFAULT_MAX_THRESHOLD,
        }
    }
}

/// Validated calibration configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pub thresholds: Thresholds,
    /// When false, the percentage is the sensitivity-adjusted score.
    pub rescale: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            rescale: true,
        }
    }
}

impl Calibration {
    pub fn new(thresholds: Thresholds, rescale: bool) -> Self {
        Self { thresholds, rescale }
    }

    /// Apply the sensitivity exponent.
    pub fn adjust(&self, raw: f32, sensitivity: Sensitivity) -> f32 {
        let r = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        r.powf(sensitivity.value())
    }

    /// Piecewise-linear rescale of an adjusted score.
    ///
    /// Continuous at both thresholds and strictly increasing on each
    /// segment, so ordering is preserved.
    pub fn rescale(&self, adjusted: f32) -> f32 {
        if !self.rescale {
            return adjusted.clamp(0.0, 1.0);
        }

        let Thresholds { min, max } = self.thresholds;
        let r = adjusted.clamp(0.0, 1.0);
        let p = if r < min {
            (r / min) * LOW_BREAKPOINT
        } else if r <= max {
            LOW_BREAKPOINT + (r - min) / (max - min) * (HIGH_BREAKPOINT - LOW_BREAKPOINT)
        } else {
            HIGH_BREAKPOINT + (r - max) / (1.0 - max) * (1.0 - HIGH_BREAKPOINT)
        };
        p.clamp(0.0, 1.0)
    }

    /// Sensitivity, then rescale.
    pub fn calibrate(&self, raw: RawScore, sensitivity: Sensitivity) -> Comparison {
        let adjusted = self.adjust(raw.value(), sensitivity);
        let score = self.rescale(adjusted);
        Comparison {
            method: raw.method(),
            raw_score: raw.value(),
            adjusted_score: adjusted,
            score,
            percentage: score * 100.0,
            sensitivity: sensitivity.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoreMethod;

    const EPS: f32 = 1e-4;

    fn calibrate(r: f32) -> f32 {
        Calibration::default()
            .calibrate(RawScore::new(r, ScoreMethod::Hybrid), Sensitivity::NEUTRAL)
            .score
    }

    #[test]
    fn test_monotonic() {
        let configs = [
            Calibration::default(),
            Calibration::new(Thresholds::new(0.2, 0.8).unwrap(), true),
            Calibration::new(Thresholds::new(0.0, 1.0).unwrap(), true),
            Calibration::new(Thresholds::default(), false),
        ];
        for cal in configs {
            for s in [0.5, 1.0, 10.0] {
                let sensitivity = Sensitivity::new(s).unwrap();
                let score = |r: f32| {
                    cal.calibrate(RawScore::new(r, ScoreMethod::Hybrid), sensitivity)
                        .score
                };
                let mut prev = score(0.0);
                for i in 1..=1000 {
                    let next = score(i as f32 / 1000.0);
                    assert!(next >= prev, "{cal:?} s={s}: inversion at {i}: {prev} > {next}");
                    prev = next;
                }
            }
        }
    }

    #[test]
    fn test_continuous_at_breakpoints() {
        assert!((calibrate(0.3 - 1e-6) - 0.10).abs() < EPS);
        assert!((calibrate(0.3) - 0.10).abs() < EPS);
        assert!((calibrate(0.3 + 1e-6) - 0.10).abs() < EPS);
        assert!((calibrate(0.7 - 1e-6) - 0.60).abs() < EPS);
        assert!((calibrate(0.7) - 0.60).abs() < EPS);
        assert!((calibrate(0.7 + 1e-6) - 0.60).abs() < EPS);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(calibrate(0.0), 0.0);
        assert!((calibrate(1.0) - 1.0).abs() < EPS);
        let c = Calibration::default()
            .calibrate(RawScore::new(1.0, ScoreMethod::Structural), Sensitivity::NEUTRAL);
        assert!((c.percentage - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_neutral_sensitivity_is_noop() {
        let cal = Calibration::default();
        for r in [0.0, 0.123, 0.5, 0.99, 1.0] {
            assert!((cal.adjust(r, Sensitivity::NEUTRAL) - r).abs() < 1e-6);
        }
    }

    #[test]
    fn test_strict_vs_lenient() {
        let cal = Calibration::default();
        let strict = cal.adjust(0.5, Sensitivity::new(10.0).unwrap());
        let lenient = cal.adjust(0.5, Sensitivity::new(0.5).unwrap());
        assert!(strict < 0.01);
        assert!(lenient > 0.7);
        assert!(lenient - strict > 0.5);
    }

    #[test]
    fn test_rescale_disabled_passes_through() {
        let cal = Calibration::new(Thresholds::default(), false);
        let c = cal.calibrate(RawScore::new(0.42, ScoreMethod::Embedding), Sensitivity::NEUTRAL);
        assert!((c.score - 0.42).abs() < 1e-6);
        assert!((c.percentage - 42.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_sensitivity() {
        for v in [-1.0, 0.0, 10.01, f32::NAN, f32::INFINITY] {
            assert!(matches!(Sensitivity::new(v), Err(StandError::InvalidSensitivity(_))));
        }
        assert!(Sensitivity::new(10.0).is_ok());
        assert!(Sensitivity::new(0.001).is_ok());
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(matches!(Thresholds::new(0.7, 0.3), Err(StandError::InvalidThresholds { .. })));
        assert!(matches!(Thresholds::new(0.5, 0.5), Err(StandError::InvalidThresholds { .. })));
        assert!(Thresholds::new(-0.1, 0.5).is_err());
        assert!(Thresholds::new(0.2, 1.1).is_err());
        assert!(Thresholds::new(f32::NAN, 0.5).is_err());
        assert!(Thresholds::new(0.2, 0.8).is_ok());
    }

    #[test]
    fn test_thresholds_at_range_edges() {
        let open_low = Calibration::new(Thresholds::new(0.0, 0.7).unwrap(), true);
        assert!((open_low.rescale(0.0) - LOW_BREAKPOINT).abs() < EPS);
        assert!((open_low.rescale(0.7) - HIGH_BREAKPOINT).abs() < EPS);

        let open_high = Calibration::new(Thresholds::new(0.3, 1.0).unwrap(), true);
        assert_eq!(open_high.rescale(0.0), 0.0);
        assert!((open_high.rescale(1.0) - HIGH_BREAKPOINT).abs() < EPS);
        assert!(open_high.rescale(1.0).is_finite());
    }

    #[test]
    fn test_setting_rejects_and_keeps_previous() {
        let setting = SensitivitySetting::new(Sensitivity::new(2.0).unwrap());
        assert!(matches!(setting.set(-1.0), Err(StandError::InvalidSensitivity(_))));
        assert_eq!(setting.get().value(), 2.0);

        let prev = setting.set(4.0).unwrap();
        assert_eq!(prev.value(), 2.0);
        assert_eq!(setting.get().value(), 4.0);
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let setting = SensitivitySetting::default();
        assert_eq!(setting.resolve(Some(3.0)).unwrap().value(), 3.0);
        assert_eq!(setting.resolve(None).unwrap().value(), 1.0);
        assert!(setting.resolve(Some(11.0)).is_err());
    }

    #[test]
    fn test_sensitivity_deserialize_validates() {
        assert!(serde_json::from_str::<Sensitivity>("2.5").is_ok());
        assert!(serde_json::from_str::<Sensitivity>("-3").is_err());
    }
}
