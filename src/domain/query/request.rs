//! Query request validation and normalization

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::search::SourceType;
use crate::domain::DomainError;

/// Hard cap on query length before embedding
pub const MAX_QUERY_CHARS: usize = 2000;

/// Thresholds are kept to four decimal places so cache keys and backends agree
const THRESHOLD_SCALE: f32 = 10_000.0;

/// Bounds applied to incoming requests
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub min_limit: usize,
    pub max_limit: usize,
    pub default_threshold: f32,
}

impl QueryLimits {
    /// Reject bounds that could not clamp a request
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_limit == 0 {
            return Err(DomainError::configuration("query.min_limit must be at least 1"));
        }

        if self.min_limit > self.max_limit {
            return Err(DomainError::configuration(format!(
                "query.min_limit ({}) exceeds query.max_limit ({})",
                self.min_limit, self.max_limit
            )));
        }

        if !(self.min_limit..=self.max_limit).contains(&self.default_limit) {
            return Err(DomainError::configuration(format!(
                "query.default_limit ({}) is outside {}..={}",
                self.default_limit, self.min_limit, self.max_limit
            )));
        }

        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(DomainError::configuration(
                "query.default_threshold must be within 0..=1",
            ));
        }

        Ok(())
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            min_limit: 1,
            max_limit: 50,
            default_threshold: 0.5,
        }
    }
}

/// Incoming query as received from a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesize: Option<bool>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceType>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_synthesize(mut self, synthesize: bool) -> Self {
        self.synthesize = Some(synthesize);
        self
    }

    /// Validate the query and clamp out-of-range parameters
    pub fn normalize(&self, limits: &QueryLimits) -> Result<NormalizedQuery, DomainError> {
        let text = preprocess_query(&self.query);

        if text.is_empty() {
            return Err(DomainError::validation("Query must not be empty"));
        }

        let limit = match self.limit {
            Some(limit) => limit.clamp(limits.min_limit as i64, limits.max_limit as i64) as usize,
            None => limits.default_limit,
        };

        let threshold = match self.threshold {
            Some(t) if t.is_nan() => limits.default_threshold,
            Some(t) => t.clamp(0.0, 1.0),
            None => limits.default_threshold,
        };
        let threshold = (threshold * THRESHOLD_SCALE).round() / THRESHOLD_SCALE;

        let sources = self
            .sources
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().copied().collect::<BTreeSet<_>>());

        Ok(NormalizedQuery {
            text,
            sources,
            limit,
            threshold,
            synthesize: self.synthesize.unwrap_or(true),
        })
    }
}

/// A validated request with all parameters inside legal bounds
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// Trimmed query text, original casing preserved
    pub text: String,
    /// Source filter; `None` means all sources
    pub sources: Option<BTreeSet<SourceType>>,
    pub limit: usize,
    pub threshold: f32,
    pub synthesize: bool,
}

impl NormalizedQuery {
    /// Whether a backend serving `source_type` should be queried
    pub fn includes(&self, source_type: SourceType) -> bool {
        self.sources
            .as_ref()
            .map(|s| s.contains(&source_type))
            .unwrap_or(true)
    }

    /// Lower-cased query text used for cache addressing
    pub fn cache_text(&self) -> String {
        cache_text(&self.text)
    }
}

/// Lower-case and trim text for cache addressing
pub fn cache_text(text: &str) -> String {
    preprocess_query(text).to_lowercase()
}

/// Trim, strip zero-width characters, collapse whitespace, and cap length
pub fn preprocess_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| !matches!(*c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_query() {
        let result = QueryRequest::new("   \n\t ").normalize(&QueryLimits::default());

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_defaults_applied() {
        let normalized = QueryRequest::new("what is AOMA")
            .normalize(&QueryLimits::default())
            .unwrap();

        assert_eq!(normalized.text, "what is AOMA");
        assert_eq!(normalized.limit, 10);
        assert_eq!(normalized.threshold, 0.5);
        assert!(normalized.synthesize);
        assert!(normalized.sources.is_none());
    }

    #[test]
    fn test_limit_and_threshold_are_clamped() {
        let limits = QueryLimits::default();

        let high = QueryRequest::new("q")
            .with_limit(500)
            .with_threshold(3.0)
            .normalize(&limits)
            .unwrap();
        assert_eq!(high.limit, 50);
        assert_eq!(high.threshold, 1.0);

        let low = QueryRequest::new("q")
            .with_limit(-4)
            .with_threshold(-0.5)
            .normalize(&limits)
            .unwrap();
        assert_eq!(low.limit, 1);
        assert_eq!(low.threshold, 0.0);
    }

    #[test]
    fn test_threshold_rounded_once() {
        let limits = QueryLimits::default();

        let plain = QueryRequest::new("q").with_threshold(0.2).normalize(&limits).unwrap();
        let noisy = QueryRequest::new("q").with_threshold(0.20004).normalize(&limits).unwrap();
        let distinct = QueryRequest::new("q").with_threshold(0.2001).normalize(&limits).unwrap();

        assert_eq!(plain.threshold, noisy.threshold);
        assert_eq!(noisy.threshold, 0.2);
        assert_ne!(plain.threshold, distinct.threshold);
    }

    #[test]
    fn test_limits_validation() {
        assert!(QueryLimits::default().validate().is_ok());

        let inverted = QueryLimits {
            min_limit: 60,
            max_limit: 50,
            ..QueryLimits::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(DomainError::Configuration { .. })
        ));

        let zero = QueryLimits {
            min_limit: 0,
            ..QueryLimits::default()
        };
        assert!(zero.validate().is_err());

        let default_out_of_range = QueryLimits {
            default_limit: 80,
            ..QueryLimits::default()
        };
        assert!(default_out_of_range.validate().is_err());

        let bad_threshold = QueryLimits {
            default_threshold: 1.5,
            ..QueryLimits::default()
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_empty_source_filter_means_all() {
        let normalized = QueryRequest::new("q")
            .with_sources(vec![])
            .normalize(&QueryLimits::default())
            .unwrap();

        assert!(normalized.includes(SourceType::Wiki));
    }

    #[test]
    fn test_source_filter() {
        let normalized = QueryRequest::new("q")
            .with_sources(vec![SourceType::Jira, SourceType::Git, SourceType::Jira])
            .normalize(&QueryLimits::default())
            .unwrap();

        assert_eq!(normalized.sources.as_ref().unwrap().len(), 2);
        assert!(normalized.includes(SourceType::Git));
        assert!(!normalized.includes(SourceType::Email));
    }

    #[test]
    fn test_preprocess_query() {
        assert_eq!(preprocess_query("  how\u{200B} do   uploads\nwork "), "how do uploads work");

        let long = "a".repeat(MAX_QUERY_CHARS + 100);
        assert_eq!(preprocess_query(&long).len(), MAX_QUERY_CHARS);
    }

    #[test]
    fn test_cache_text_ignores_case_and_spacing() {
        assert_eq!(cache_text("  What is   AOMA "), cache_text("what is aoma"));
    }

    #[test]
    fn test_deserialize_request() {
        let json = serde_json::json!({
            "query": "what is AOMA",
            "sources": ["jira", "wiki"],
            "limit": 5,
            "threshold": 0.2
        });

        let request: QueryRequest = serde_json::from_value(json).unwrap();

        assert_eq!(request.limit, Some(5));
        assert_eq!(request.sources.unwrap(), vec![SourceType::Jira, SourceType::Wiki]);
        assert!(request.synthesize.is_none());
    }
}
