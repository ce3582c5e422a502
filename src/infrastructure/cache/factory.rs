//! Builds the two cache tiers used by the query pipeline

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::Cache;
use crate::domain::query::QueryResponse;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};

/// Response cache defaults: five minutes, 1000 entries
pub const RESPONSE_TTL: Duration = Duration::from_secs(300);
pub const RESPONSE_CAPACITY: u64 = 1000;
/// Embedding cache defaults: one hour, 5000 entries
pub const EMBEDDING_TTL: Duration = Duration::from_secs(3600);
pub const EMBEDDING_CAPACITY: u64 = 5000;

/// Full-response and embedding caches, injected into the services that use them
#[derive(Debug, Clone)]
pub struct QueryCaches {
    pub responses: Arc<dyn Cache<QueryResponse>>,
    pub embeddings: Arc<dyn Cache<Vec<f32>>>,
}

impl Default for QueryCaches {
    fn default() -> Self {
        Self::in_memory(
            InMemoryCacheConfig::default()
                .with_max_capacity(RESPONSE_CAPACITY)
                .with_ttl(RESPONSE_TTL),
            InMemoryCacheConfig::default()
                .with_max_capacity(EMBEDDING_CAPACITY)
                .with_ttl(EMBEDDING_TTL),
        )
    }
}

impl QueryCaches {
    pub fn new(
        responses: Arc<dyn Cache<QueryResponse>>,
        embeddings: Arc<dyn Cache<Vec<f32>>>,
    ) -> Self {
        Self {
            responses,
            embeddings,
        }
    }

    /// Creates both tiers backed by moka
    pub fn in_memory(response: InMemoryCacheConfig, embedding: InMemoryCacheConfig) -> Self {
        Self {
            responses: Arc::new(InMemoryCache::with_config(response)),
            embeddings: Arc::new(InMemoryCache::with_config(embedding)),
        }
    }
}
