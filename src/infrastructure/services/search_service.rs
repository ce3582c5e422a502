//! Concurrent multi-source search with score reconciliation

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::timeout;

use crate::domain::query::{as_millis, NormalizedQuery};
use crate::domain::search::{ScorePolicy, SearchSource, SourceQuery, SourceType, VectorResult};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_source_failure;

/// Default per-backend deadline during fan-out
pub const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Merged results plus a record of which backends took part
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<VectorResult>,
    /// Backends that were queried, in registration order
    pub queried: Vec<String>,
    /// Backends that failed or timed out
    pub failed: Vec<String>,
}

/// Fans a query out to every applicable backend and merges the answers
#[derive(Debug)]
pub struct SearchEngine {
    sources: Vec<Arc<dyn SearchSource>>,
    policy: ScorePolicy,
    fanout_timeout: Option<Duration>,
}

impl SearchEngine {
    pub fn new(sources: Vec<Arc<dyn SearchSource>>) -> Self {
        Self {
            sources,
            policy: ScorePolicy::default(),
            fanout_timeout: Some(DEFAULT_FANOUT_TIMEOUT),
        }
    }

    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Per-backend deadline; `None` waits for every backend
    pub fn with_fanout_timeout(mut self, fanout_timeout: Option<Duration>) -> Self {
        self.fanout_timeout = fanout_timeout;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn SearchSource>] {
        &self.sources
    }

    pub async fn search(
        &self,
        embedding: &[f32],
        query: &NormalizedQuery,
    ) -> Result<SearchOutcome, DomainError> {
        let branches: Vec<_> = self
            .sources
            .iter()
            .filter_map(|source| {
                let source_types: Vec<SourceType> = source
                    .source_types()
                    .iter()
                    .copied()
                    .filter(|t| query.includes(*t))
                    .collect();

                if source_types.is_empty() {
                    tracing::debug!(source = source.name(), "Skipping backend outside source filter");
                    return None;
                }

                let source_query = SourceQuery {
                    embedding,
                    text: &query.text,
                    threshold: query.threshold,
                    limit: query.limit,
                    source_types,
                };

                Some(self.run_branch(source, source_query))
            })
            .collect();

        let mut outcome = SearchOutcome::default();
        let mut merged = Vec::new();

        for (name, result) in join_all(branches).await {
            outcome.queried.push(name.clone());

            match result {
                Ok(results) => {
                    merged.extend(results.into_iter().filter(|r| query.includes(r.source_type)));
                }
                Err(e) => {
                    tracing::warn!(source = %name, error = %e, "Search backend failed, continuing without it");
                    record_source_failure(&name);
                    outcome.failed.push(name);
                }
            }
        }

        outcome.results = self.policy.rank(merged, query.limit);

        tracing::debug!(
            queried = outcome.queried.len(),
            failed = outcome.failed.len(),
            results = outcome.results.len(),
            "Search fan-out completed"
        );

        Ok(outcome)
    }

    async fn run_branch(
        &self,
        source: &Arc<dyn SearchSource>,
        query: SourceQuery<'_>,
    ) -> (String, Result<Vec<VectorResult>, DomainError>) {
        let name = source.name().to_string();
        let started = Instant::now();
        let search = source.search(&query);

        let result = match self.fanout_timeout {
            Some(deadline) => match timeout(deadline, search).await {
                Ok(result) => result,
                Err(_) => Err(DomainError::timeout(format!("search:{}", name), as_millis(deadline))),
            },
            None => search.await,
        };

        tracing::debug!(
            source = %name,
            kind = source.kind().as_str(),
            elapsed_ms = as_millis(started.elapsed()),
            rows = result.as_ref().map(|r| r.len()).unwrap_or(0),
            "Backend search finished"
        );

        (name, result)
    }
}
