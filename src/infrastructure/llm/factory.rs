use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::http_client::HttpClient;
use super::{AnthropicProvider, OpenAiProvider};
use crate::domain::{DomainError, LlmProvider};

/// Supported text generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LlmProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
    pub kind: LlmProviderKind,
    pub model: String,
    /// Override for self-hosted or proxied endpoints
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl LlmProviderConfig {
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            kind: LlmProviderKind::OpenAi,
            model: model.into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }

    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            kind: LlmProviderKind::Anthropic,
            model: model.into(),
            base_url: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Reads the API key; absence is reported on first use, not here
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// `request_timeout` bounds the underlying HTTP request independently of
    /// the synthesis deadline.
    pub fn create(
        config: &LlmProviderConfig,
        request_timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let http_client = HttpClient::with_timeout(request_timeout)?;
        let api_key = config.api_key();

        let provider: Arc<dyn LlmProvider> = match (config.kind, config.base_url.as_deref()) {
            (LlmProviderKind::OpenAi, Some(url)) => {
                Arc::new(OpenAiProvider::with_base_url(http_client, api_key, url))
            }
            (LlmProviderKind::OpenAi, None) => Arc::new(OpenAiProvider::new(http_client, api_key)),
            (LlmProviderKind::Anthropic, Some(url)) => {
                Arc::new(AnthropicProvider::with_base_url(http_client, api_key, url))
            }
            (LlmProviderKind::Anthropic, None) => {
                Arc::new(AnthropicProvider::new(http_client, api_key))
            }
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_providers() {
        let openai = LlmProviderFactory::create(
            &LlmProviderConfig::openai("gpt-4o-mini"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(openai.provider_name(), "openai");

        let anthropic = LlmProviderFactory::create(
            &LlmProviderConfig::anthropic("claude-3-5-haiku-20241022")
                .with_base_url("http://localhost:9999"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(anthropic.provider_name(), "anthropic");
    }

    #[test]
    fn test_deserialize_config() {
        let json = serde_json::json!({
            "kind": "anthropic",
            "model": "claude-3-5-haiku-20241022",
            "api_key_env": "MY_KEY"
        });

        let config: LlmProviderConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.kind, LlmProviderKind::Anthropic);
        assert!(config.base_url.is_none());
        assert_eq!(config.api_key_env, "MY_KEY");
    }

    #[test]
    fn test_missing_env_key_is_none() {
        let mut config = LlmProviderConfig::openai("gpt-4o-mini");
        config.api_key_env = "KNOWLEDGE_QUERY_TEST_UNSET_KEY".to_string();

        assert!(config.api_key().is_none());
    }
}
