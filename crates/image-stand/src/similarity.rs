//! Cosine similarity between embeddings.

use crate::types::{Embedding, StandError, StandResult};

/// Compute cosine similarity between two vectors.
///
/// Mismatched lengths, empty input, and zero vectors yield 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// Cosine similarity of two embeddings from the same extractor version.
pub fn embedding_similarity(a: &Embedding, b: &Embedding) -> StandResult<f32> {
    if a.extractor != b.extractor || a.dims() != b.dims() {
        return Err(StandError::EmbeddingMismatch {
            left: format!("{} ({} dims)", a.extractor, a.dims()),
            right: format!("{} ({} dims)", b.extractor, b.dims()),
        });
    }
    Ok(cosine_similarity(&a.values, &b.values))
}

/// Rescale a cosine similarity from [-1, 1] into [0, 1].
pub fn cosine_to_unit(cos: f32) -> f32 {
    ((cos + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_cosine_to_unit() {
        assert_eq!(cosine_to_unit(-1.0), 0.0);
        assert_eq!(cosine_to_unit(0.0), 0.5);
        assert_eq!(cosine_to_unit(1.0), 1.0);
    }

    #[test]
    fn test_versions_never_mix() {
        let a = Embedding::new(vec![1.0, 0.0], "clip-vit-b32-onnx");
        let b = Embedding::new(vec![1.0, 0.0], "rgb-histogram-4");
        assert!(matches!(
            embedding_similarity(&a, &b),
            Err(StandError::EmbeddingMismatch { .. })
        ));
        assert!((embedding_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }
}
