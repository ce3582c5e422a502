//! Embedding results and vector math

use std::time::Duration;

/// Outcome of embedding a query
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    /// Whether the vector came from the embedding cache
    pub cached: bool,
    pub duration: Duration,
}

impl EmbeddingResult {
    pub fn new(embedding: Vec<f32>, cached: bool, duration: Duration) -> Self {
        Self {
            embedding,
            cached,
            duration,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let similarity = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);

        assert!((similarity - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let similarity = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);

        assert!(similarity.abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_result_dimensions() {
        let result = EmbeddingResult::new(vec![0.1; 8], true, Duration::ZERO);

        assert_eq!(result.dimensions(), 8);
        assert!(result.cached);
    }
}
