use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::query::QueryLimits;
use crate::domain::search::{ScorePolicy, SourceType, TieBreak};
use crate::infrastructure::cache::{
    InMemoryCacheConfig, EMBEDDING_CAPACITY, EMBEDDING_TTL, RESPONSE_CAPACITY, RESPONSE_TTL,
};
use crate::infrastructure::llm::LlmProviderConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::services::SynthesisConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub synthesis: SynthesisSettings,
    pub query: QueryLimits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Postgres connection; without a URL the in-memory backends are used
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub response_ttl_secs: u64,
    pub response_capacity: u64,
    pub embedding_ttl_secs: u64,
    pub embedding_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-backend deadline during fan-out; unset waits indefinitely
    pub fanout_timeout_ms: Option<u64>,
    /// Similarity multipliers keyed by source type
    pub discounts: HashMap<SourceType, f32>,
    pub tie_break: TieBreak,
    /// Tenant scope passed to the vector similarity function
    pub scope: String,
    pub vector_source_types: Vec<SourceType>,
    pub wiki_app_name: Option<String>,
    pub keyword_default_term: String,
    pub vector_table: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub primary: LlmProviderConfig,
    pub secondary: Option<LlmProviderConfig>,
    pub deadline_ms: u64,
    pub per_result_chars: usize,
    pub total_context_chars: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            response_ttl_secs: RESPONSE_TTL.as_secs(),
            response_capacity: RESPONSE_CAPACITY,
            embedding_ttl_secs: EMBEDDING_TTL.as_secs(),
            embedding_capacity: EMBEDDING_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn response(&self) -> InMemoryCacheConfig {
        InMemoryCacheConfig::default()
            .with_max_capacity(self.response_capacity)
            .with_ttl(Duration::from_secs(self.response_ttl_secs))
    }

    pub fn embedding(&self) -> InMemoryCacheConfig {
        InMemoryCacheConfig::default()
            .with_max_capacity(self.embedding_capacity)
            .with_ttl(Duration::from_secs(self.embedding_ttl_secs))
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl EmbeddingConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fanout_timeout_ms: Some(8000),
            discounts: HashMap::from([(SourceType::Jira, 0.6)]),
            tie_break: TieBreak::default(),
            scope: "aoma".to_string(),
            vector_source_types: vec![
                SourceType::Git,
                SourceType::Jira,
                SourceType::Knowledge,
                SourceType::Email,
                SourceType::Metrics,
            ],
            wiki_app_name: Some("AOMA_WIKI".to_string()),
            keyword_default_term: "aoma".to_string(),
            vector_table: "knowledge_vectors".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn fanout_timeout(&self) -> Option<Duration> {
        self.fanout_timeout_ms.map(Duration::from_millis)
    }

    pub fn score_policy(&self) -> ScorePolicy {
        self.discounts
            .iter()
            .fold(ScorePolicy::new(), |policy, (source_type, factor)| {
                policy.with_discount(*source_type, *factor)
            })
            .with_tie_break(self.tie_break)
    }
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        let engine = SynthesisConfig::default();

        Self {
            primary: LlmProviderConfig::openai("gpt-4o-mini"),
            secondary: Some(LlmProviderConfig::anthropic("claude-3-5-haiku-latest")),
            deadline_ms: engine.deadline.as_millis() as u64,
            per_result_chars: engine.per_result_chars,
            total_context_chars: engine.total_context_chars,
            temperature: engine.temperature,
            max_tokens: engine.max_tokens,
        }
    }
}

impl SynthesisSettings {
    pub fn engine_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            deadline: Duration::from_millis(self.deadline_ms),
            per_result_chars: self.per_result_chars,
            total_context_chars: self.total_context_chars,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would fail every request
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.query
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.search.fanout_timeout(), Some(Duration::from_millis(8000)));
        assert_eq!(config.synthesis.deadline_ms, 10_000);
        assert_eq!(config.query.max_limit, 50);
    }

    #[test]
    fn test_score_policy_from_discounts() {
        let policy = SearchConfig::default().score_policy();

        assert!((policy.discount_for(SourceType::Jira) - 0.6).abs() < 1e-6);
        assert_eq!(policy.discount_for(SourceType::Wiki), 1.0);
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let json = serde_json::json!({
            "search": { "tie_break": "source_id", "fanout_timeout_ms": null },
            "synthesis": { "secondary": null, "deadline_ms": 2500 },
            "query": { "max_limit": 20 }
        });

        let config: AppConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.search.tie_break, TieBreak::SourceId);
        assert!(config.search.fanout_timeout().is_none());
        assert_eq!(config.search.scope, "aoma");
        assert!(config.synthesis.secondary.is_none());
        assert_eq!(config.synthesis.engine_config().deadline, Duration::from_millis(2500));
        assert_eq!(config.query.max_limit, 20);
        assert_eq!(config.query.default_limit, 10);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let json = serde_json::json!({ "query": { "min_limit": 60, "max_limit": 50 } });
        let config: AppConfig = serde_json::from_value(json).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_limit"));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cache_tiers() {
        let cache = CacheConfig::default();

        assert_eq!(cache.response().ttl, RESPONSE_TTL);
        assert_eq!(cache.embedding().max_capacity, EMBEDDING_CAPACITY);
    }
}
