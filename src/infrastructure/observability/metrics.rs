//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish()
    }
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("knowledge_query_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Final state of a query, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success,
    CacheHit,
    Degraded,
    Failure,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::CacheHit => "cache_hit",
            Self::Degraded => "degraded",
            Self::Failure => "failure",
        }
    }
}

/// Record a completed query
pub fn record_query(outcome: QueryOutcome, duration: Duration) {
    let labels = [("outcome", outcome.as_str().to_string())];

    counter!("knowledge_query_requests_total", &labels).increment(1);
    histogram!("knowledge_query_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_cache_hit() {
    counter!("knowledge_query_cache_hits_total").increment(1);
}

/// Record a search backend that failed or timed out
pub fn record_source_failure(source: &str) {
    counter!("knowledge_query_source_failures_total", "source" => source.to_string())
        .increment(1);
}

pub fn record_synthesis_fallback() {
    counter!("knowledge_query_synthesis_fallbacks_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(QueryOutcome::Success.as_str(), "success");
        assert_eq!(QueryOutcome::CacheHit.as_str(), "cache_hit");
        assert_eq!(QueryOutcome::Degraded.as_str(), "degraded");
        assert_eq!(QueryOutcome::Failure.as_str(), "failure");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_query(QueryOutcome::Success, Duration::from_millis(5));
        record_cache_hit();
        record_source_failure("wiki");
        record_synthesis_fallback();
    }

    #[test]
    fn test_disabled_metrics() {
        let config = MetricsConfig {
            enabled: false,
            path: "/metrics".to_string(),
        };

        assert!(init_metrics(&config).is_none());
    }
}
