//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_hit, record_query, record_source_failure,
    record_synthesis_fallback, PrometheusMetrics, QueryOutcome,
};
