//! Cache key generation strategies

use std::collections::BTreeMap;
use std::fmt::Debug;

use sha2::{Digest, Sha256};

use crate::domain::query::{cache_text, NormalizedQuery};

/// Namespace for full query responses
pub const RESPONSE_NAMESPACE: &str = "query";
/// Namespace for query embeddings
pub const EMBEDDING_NAMESPACE: &str = "embedding";

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Generates a cache key from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;

    /// Generates a key with a namespace prefix
    fn generate_with_namespace(&self, namespace: &str, params: &CacheKeyParams) -> String {
        format!("{}:{}", namespace, self.generate(params))
    }

    /// Key addressing the full response for a normalized request
    fn response_key(&self, query: &NormalizedQuery) -> String {
        self.generate_with_namespace(RESPONSE_NAMESPACE, &CacheKeyParams::for_query(query))
    }

    /// Key addressing the embedding of a query text, independent of other parameters
    fn embedding_key(&self, text: &str) -> String {
        self.generate_with_namespace(EMBEDDING_NAMESPACE, &CacheKeyParams::new(cache_text(text)))
    }
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (normalized query text)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters with a primary identifier
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Parameters covering every field that changes a query's answer
    pub fn for_query(query: &NormalizedQuery) -> Self {
        let sources = query
            .sources
            .as_ref()
            .map(|s| s.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(","))
            .unwrap_or_else(|| "*".to_string());

        Self::new(query.cache_text())
            .with_component("sources", sources)
            .with_component("limit", query.limit.to_string())
            .with_component("threshold", format!("{:.4}", query.threshold))
            .with_component("synthesize", query.synthesize.to_string())
    }
}

/// Default cache key generator using SHA-256 digests
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyGenerator {
    /// Whether to emit the readable key instead of its digest
    plain: bool,
}

impl DefaultKeyGenerator {
    /// Creates a new default key generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that produces readable, unhashed keys
    pub fn plain() -> Self {
        Self { plain: true }
    }

    fn hash_string(input: &str) -> String {
        hex::encode(Sha256::digest(input.as_bytes()))
    }
}

impl CacheKeyGenerator for DefaultKeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        let mut parts = vec![params.primary.clone()];

        for (k, v) in &params.components {
            parts.push(format!("{}={}", k, v));
        }

        let combined = parts.join("|");

        if self.plain {
            combined
        } else {
            Self::hash_string(&combined)
        }
    }
}
