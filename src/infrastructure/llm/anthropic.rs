use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage,
};

pub(crate) const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic messages API provider, used as the secondary synthesis model
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: Option<String>,
    base_url: String,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let anthropic_messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(AnthropicMessage::from_domain)
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": anthropic_messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system_content) = request.system_text() {
            body["system"] = serde_json::json!(system_content);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, DomainError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration("Anthropic API key is not configured"))?;

        Ok(vec![
            ("x-api-key", api_key),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ])
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("anthropic", format!("Failed to parse response: {}", e))
        })?;

        let content = response
            .content
            .into_iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let message = Message::assistant(content);

        let mut llm_response = LlmResponse::new(response.id, response.model, message)
            .with_finish_reason(parse_stop_reason(response.stop_reason.as_deref()));

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.input_tokens, usage.output_tokens));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let headers = self.headers()?;
        let url = self.messages_url();
        let body = self.build_request(model, &request);
        let response = self.client.post_json(&url, headers, &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

fn parse_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

impl AnthropicMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "assistant",
            MessageRole::User | MessageRole::System => "user",
        };

        Self {
            role,
            content: message.content_text().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn request() -> LlmRequest {
        LlmRequest::builder()
            .system("Answer only from the context")
            .user("What is AOMA?")
            .build()
    }

    #[tokio::test]
    async fn test_anthropic_chat() {
        let mock_response = serde_json::json!({
            "id": "msg_123",
            "model": "claude-3-5-haiku-20241022",
            "content": [
                {"type": "text", "text": "AOMA stores "},
                {"type": "text", "text": "media assets."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 30, "output_tokens": 6}
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = AnthropicProvider::new(client, Some("sk-ant".to_string()));

        let response = provider
            .chat("claude-3-5-haiku-20241022", request())
            .await
            .unwrap();

        assert_eq!(response.content(), "AOMA stores media assets.");
        assert_eq!(response.usage.unwrap().total_tokens, 36);
    }

    #[tokio::test]
    async fn test_system_prompt_moved_to_top_level() {
        let mock_response = serde_json::json!({
            "id": "msg_1", "model": "m",
            "content": [{"type": "text", "text": "ok"}],
            "stop_reason": "max_tokens"
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = AnthropicProvider::new(client, Some("sk-ant".to_string()));

        let response = provider.chat("m", request()).await.unwrap();
        let body = provider.client.last_body().unwrap();

        assert_eq!(body["system"], "Answer only from the context");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(response.finish_reason, Some(FinishReason::Length));
        assert_eq!(
            provider.client.last_header("x-api-key").as_deref(),
            Some("sk-ant")
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let provider = AnthropicProvider::new(MockHttpClient::new(), Some("  ".to_string()));

        let err = provider.chat("m", request()).await.unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let client = MockHttpClient::new().with_error(TEST_URL, "overloaded");
        let provider = AnthropicProvider::new(client, Some("sk-ant".to_string()));

        let err = provider.chat("m", request()).await.unwrap_err();

        assert!(matches!(err, DomainError::Provider { .. }));
    }
}
