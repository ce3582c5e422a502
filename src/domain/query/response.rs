//! Query response, metrics, and failure types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::search::VectorResult;
use crate::domain::DomainError;

/// Per-stage timing collected while answering a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub total_ms: u64,
    pub cache_hit: bool,
    pub embedding_ms: u64,
    pub search_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_ms: Option<u64>,
}

impl QueryMetrics {
    pub fn record_embedding(&mut self, elapsed: Duration) {
        self.embedding_ms = as_millis(elapsed);
    }

    pub fn record_search(&mut self, elapsed: Duration) {
        self.search_ms = as_millis(elapsed);
    }

    pub fn record_synthesis(&mut self, elapsed: Duration) {
        self.synthesis_ms = Some(as_millis(elapsed));
    }

    pub fn finish(&mut self, total: Duration) {
        self.total_ms = as_millis(total);
    }
}

pub(crate) fn as_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Successful query answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<VectorResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
    pub metrics: QueryMetrics,
}

impl QueryResponse {
    pub fn new(results: Vec<VectorResult>, synthesis: Option<String>, metrics: QueryMetrics) -> Self {
        Self {
            results,
            synthesis,
            metrics,
        }
    }

    /// Copy of a cached answer re-stamped for the current lookup
    pub fn from_cache(cached: &QueryResponse, lookup: Duration) -> Self {
        Self {
            results: cached.results.clone(),
            synthesis: cached.synthesis.clone(),
            metrics: QueryMetrics {
                total_ms: as_millis(lookup),
                cache_hit: true,
                embedding_ms: 0,
                search_ms: 0,
                synthesis_ms: None,
            },
        }
    }
}

/// Failed query with whatever timing was collected before the failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub error: String,
    /// Error category (`validation`, `provider`, `timeout`, ...)
    #[serde(default)]
    pub kind: String,
    pub metrics: QueryMetrics,
}

impl QueryFailure {
    pub fn new(error: &DomainError, metrics: QueryMetrics) -> Self {
        Self {
            error: error.to_string(),
            kind: error.kind().to_string(),
            metrics,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind == "validation"
    }
}
