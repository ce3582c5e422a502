//! Cache-aware query embedding

use std::sync::Arc;
use std::time::Instant;

use crate::domain::cache::{Cache, CacheKeyGenerator, DefaultKeyGenerator};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingResult};
use crate::domain::query::preprocess_query;
use crate::domain::DomainError;

/// Dimensions produced by `text-embedding-3-small`
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Embeds query text, consulting the embedding cache first
#[derive(Debug)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn Cache<Vec<f32>>>,
    key_generator: DefaultKeyGenerator,
    dimensions: usize,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache: Arc<dyn Cache<Vec<f32>>>) -> Self {
        Self {
            provider,
            cache,
            key_generator: DefaultKeyGenerator::new(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed(&self, text: &str) -> Result<EmbeddingResult, DomainError> {
        let started = Instant::now();
        let text = preprocess_query(text);

        if text.is_empty() {
            return Err(DomainError::validation("Cannot embed empty text"));
        }

        let key = self.key_generator.embedding_key(&text);

        match self.cache.get(&key).await {
            Ok(Some(embedding)) if embedding.len() == self.dimensions => {
                tracing::debug!(dimensions = embedding.len(), "Embedding cache hit");
                return Ok(EmbeddingResult::new(embedding, true, started.elapsed()));
            }
            Ok(Some(embedding)) => {
                tracing::warn!(
                    cached = embedding.len(),
                    expected = self.dimensions,
                    "Discarding cached embedding with wrong dimensions"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Embedding cache lookup failed, treating as miss");
            }
        }

        let embedding = self.provider.embed(&text).await?;

        if embedding.len() != self.dimensions {
            return Err(DomainError::provider(
                self.provider.provider_name(),
                format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimensions,
                    embedding.len()
                ),
            ));
        }

        if let Err(e) = self.cache.set(&key, embedding.clone()).await {
            tracing::warn!(error = %e, "Failed to cache embedding");
        }

        tracing::debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated query embedding"
        );

        Ok(EmbeddingResult::new(embedding, false, started.elapsed()))
    }
}
