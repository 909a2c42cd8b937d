//! Windowed structural similarity (SSIM) between two images.
//!
//! Both images are reduced to 8-bit planes and compared with a sliding
//! square window. Local means, variances, and covariance come from
//! summed-area tables, so every window costs O(1).

use std::borrow::Cow;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::decode::ensure_non_empty;
use crate::types::{RawScore, ScoreMethod, StandResult};

/// Default side of the square comparison window.
pub const DEFAULT_WINDOW: u32 = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Which pixel planes enter the comparison.
///
/// `Luma` is plain grayscale SSIM with no colour information. Two flat
/// images of similar brightness, such as pure red and pure blue, score
/// high there. `LumaAndRgb` (the default) also checks each colour plane
/// and keeps the lowest score, so such pairs score low. Choose `Luma`
/// when only grayscale structure should count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneMode {
    /// Grayscale luma only.
    Luma,
    /// Luma plus each unweighted RGB plane; the lowest plane score wins.
    #[default]
    LumaAndRgb,
}

/// Structural comparator with a fixed resize and window policy.
///
/// When dimensions differ, the candidate is resized to the reference's
/// dimensions with bilinear (triangle) filtering. Nothing is cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralComparator {
    window: u32,
    planes: PlaneMode,
}

impl Default for StructuralComparator {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            planes: PlaneMode::default(),
        }
    }
}

impl StructuralComparator {
    pub fn new(planes: PlaneMode) -> Self {
        Self {
            planes,
            ..Self::default()
        }
    }

    pub fn planes(&self) -> PlaneMode {
        self.planes
    }

    /// Compare `candidate` against `reference`.
    ///
    /// The mean SSIM lies in [-1, 1]; negative values (inverted structure)
    /// are reported as 0 similarity.
    pub fn compare(
        &self,
        reference: &DynamicImage,
        candidate: &DynamicImage,
    ) -> StandResult<RawScore> {
        ensure_non_empty(reference)?;
        ensure_non_empty(candidate)?;

        let candidate = align_to(reference, candidate);
        let (w, h) = reference.dimensions();

        let score = match self.planes {
            PlaneMode::Luma => mean_ssim(
                &luma_plane(reference),
                &luma_plane(&candidate),
                w,
                h,
                self.window,
            ),
            PlaneMode::LumaAndRgb => {
                let mut lowest = mean_ssim(
                    &luma_plane(reference),
                    &luma_plane(&candidate),
                    w,
                    h,
                    self.window,
                );
                let ref_rgb = reference.to_rgb8();
                let cand_rgb = candidate.to_rgb8();
                for channel in 0..3 {
                    let a = rgb_plane(&ref_rgb, channel);
                    let b = rgb_plane(&cand_rgb, channel);
                    lowest = lowest.min(mean_ssim(&a, &b, w, h, self.window));
                }
                lowest
            }
        };

        tracing::debug!(
            "Structural similarity {score:.4} over {w}x{h} ({:?})",
            self.planes
        );
        Ok(RawScore::new(score as f32, ScoreMethod::Structural))
    }
}

/// Structural similarity with the default comparator.
pub fn structural_similarity(
    reference: &DynamicImage,
    candidate: &DynamicImage,
) -> StandResult<RawScore> {
    StructuralComparator::default().compare(reference, candidate)
}

/// Resize the candidate to the reference's dimensions if they differ.
fn align_to<'a>(reference: &DynamicImage, candidate: &'a DynamicImage) -> Cow<'a, DynamicImage> {
    let (rw, rh) = reference.dimensions();
    if candidate.dimensions() == (rw, rh) {
        Cow::Borrowed(candidate)
    } else {
        Cow::Owned(candidate.resize_exact(rw, rh, image::imageops::FilterType::Triangle))
    }
}

fn luma_plane(img: &DynamicImage) -> Vec<f64> {
    img.to_luma8().pixels().map(|p| p.0[0] as f64).collect()
}

fn rgb_plane(img: &image::RgbImage, channel: usize) -> Vec<f64> {
    img.pixels().map(|p| p.0[channel] as f64).collect()
}

/// Summed-area table with one row/column of zero padding.
struct Integral {
    width: usize,
    table: Vec<f64>,
}

impl Integral {
    fn build(w: usize, h: usize, value: impl Fn(usize) -> f64) -> Self {
        let width = w + 1;
        let mut table = vec![0.0; width * (h + 1)];
        for y in 0..h {
            let mut row = 0.0;
            for x in 0..w {
                row += value(y * w + x);
                table[(y + 1) * width + x + 1] = table[y * width + x + 1] + row;
            }
        }
        Self { width, table }
    }

    /// Sum over the `size`x`size` window whose top-left corner is (x, y).
    fn window_sum(&self, x: usize, y: usize, size: usize) -> f64 {
        let w = self.width;
        let (x1, y1) = (x + size, y + size);
        self.table[y1 * w + x1] - self.table[y * w + x1] - self.table[y1 * w + x]
            + self.table[y * w + x]
    }
}

/// Mean SSIM over every window position of two same-sized planes.
fn mean_ssim(a: &[f64], b: &[f64], w: u32, h: u32, window: u32) -> f64 {
    let (w, h) = (w as usize, h as usize);

    // Largest odd window that fits.
    let mut size = (window as usize).min(w).min(h).max(1);
    if size % 2 == 0 {
        size -= 1;
    }

    let sum_a = Integral::build(w, h, |i| a[i]);
    let sum_b = Integral::build(w, h, |i| b[i]);
    let sum_aa = Integral::build(w, h, |i| a[i] * a[i]);
    let sum_bb = Integral::build(w, h, |i| b[i] * b[i]);
    let sum_ab = Integral::build(w, h, |i| a[i] * b[i]);

    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);
    let n = (size * size) as f64;
    // Sample covariance normalisation.
    let cov_norm = if n > 1.0 { 1.0 / (n - 1.0) } else { 0.0 };

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=(h - size) {
        for x in 0..=(w - size) {
            let sa = sum_a.window_sum(x, y, size);
            let sb = sum_b.window_sum(x, y, size);
            let mu_a = sa / n;
            let mu_b = sb / n;
            let var_a = ((sum_aa.window_sum(x, y, size) - sa * mu_a) * cov_norm).max(0.0);
            let var_b = ((sum_bb.window_sum(x, y, size) - sb * mu_b) * cov_norm).max(0.0);
            let cov = (sum_ab.window_sum(x, y, size) - sa * mu_b) * cov_norm;

            let numerator = (2.0 * mu_a * mu_b + c1) * (2.0 * cov + c2);
            let denominator = (mu_a * mu_a + mu_b * mu_b + c1) * (var_a + var_b + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    total / count as f64
}
