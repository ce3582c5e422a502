//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for text embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the model used for embeddings
    fn model(&self) -> &str;
}
