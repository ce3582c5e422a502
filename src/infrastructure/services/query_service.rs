//! Query orchestration: cache, embed, search, synthesize

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use super::embedding_service::EmbeddingService;
use super::search_service::SearchEngine;
use super::synthesis_service::SynthesisEngine;
use crate::domain::cache::{Cache, CacheKeyGenerator, DefaultKeyGenerator};
use crate::domain::query::{QueryFailure, QueryLimits, QueryMetrics, QueryRequest, QueryResponse};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_hit, record_query, QueryOutcome};

/// Answers knowledge queries end to end
#[derive(Debug)]
pub struct QueryService {
    embedding: EmbeddingService,
    search: SearchEngine,
    synthesis: SynthesisEngine,
    responses: Arc<dyn Cache<QueryResponse>>,
    key_generator: DefaultKeyGenerator,
    limits: QueryLimits,
}

impl QueryService {
    pub fn new(
        embedding: EmbeddingService,
        search: SearchEngine,
        synthesis: SynthesisEngine,
        responses: Arc<dyn Cache<QueryResponse>>,
    ) -> Self {
        Self {
            embedding,
            search,
            synthesis,
            responses,
            key_generator: DefaultKeyGenerator::new(),
            limits: QueryLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// Number of responses currently cached
    pub fn cached_responses(&self) -> u64 {
        self.responses.len()
    }

    /// Run the full pipeline; failures carry the timings collected so far
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, QueryFailure> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let mut metrics = QueryMetrics::default();

        let span = tracing::info_span!("query", %request_id);
        let result = AssertUnwindSafe(self.run(&request, &mut metrics, started))
            .catch_unwind()
            .instrument(span)
            .await;

        let error = match result {
            Ok(Ok((response, outcome))) => {
                record_query(outcome, started.elapsed());
                tracing::info!(
                    %request_id,
                    outcome = outcome.as_str(),
                    results = response.results.len(),
                    total_ms = response.metrics.total_ms,
                    "Query completed"
                );
                return Ok(response);
            }
            Ok(Err(e)) => e,
            Err(panic) => DomainError::internal(format!(
                "Query pipeline panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        metrics.finish(started.elapsed());
        record_query(QueryOutcome::Failure, started.elapsed());

        if matches!(error, DomainError::Validation { .. }) {
            tracing::warn!(%request_id, error = %error, "Rejected query");
        } else {
            tracing::error!(%request_id, error = %error, kind = error.kind(), "Query failed");
        }

        Err(QueryFailure::new(&error, metrics))
    }

    async fn run(
        &self,
        request: &QueryRequest,
        metrics: &mut QueryMetrics,
        started: Instant,
    ) -> Result<(QueryResponse, QueryOutcome), DomainError> {
        let query = request.normalize(&self.limits)?;
        let key = self.key_generator.response_key(&query);

        match self.responses.get(&key).await {
            Ok(Some(cached)) => {
                record_cache_hit();
                tracing::debug!("Response cache hit");
                return Ok((
                    QueryResponse::from_cache(&cached, started.elapsed()),
                    QueryOutcome::CacheHit,
                ));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Response cache lookup failed, treating as miss"),
        }

        let stage = Instant::now();
        let embedding = self.embedding.embed(&query.text).await;
        metrics.record_embedding(stage.elapsed());
        let embedding = embedding?;

        let stage = Instant::now();
        let search = self.search.search(&embedding.embedding, &query).await;
        metrics.record_search(stage.elapsed());
        let results = search?.results;

        let mut outcome = QueryOutcome::Success;
        let synthesis = if query.synthesize {
            let stage = Instant::now();
            let synthesis = self.synthesis.synthesize(&query.text, &results).await;
            metrics.record_synthesis(stage.elapsed());

            match synthesis {
                Ok(synthesis) => Some(synthesis.text),
                Err(e) => {
                    tracing::warn!(error = %e, results = results.len(), "Synthesis failed, returning results only");
                    outcome = QueryOutcome::Degraded;
                    None
                }
            }
        } else {
            None
        };

        metrics.finish(started.elapsed());
        let response = QueryResponse::new(results, synthesis, metrics.clone());

        // Degraded answers are not cached so the next identical query retries synthesis
        if outcome == QueryOutcome::Success {
            if let Err(e) = self.responses.set(&key, response.clone()).await {
                tracing::warn!(error = %e, "Failed to cache query response");
            }
        }

        Ok((response, outcome))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
