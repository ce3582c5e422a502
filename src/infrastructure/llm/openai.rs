use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage,
};

pub(crate) const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions provider
///
/// The API key is optional at construction; a missing key only surfaces as a
/// configuration error when a completion is actually requested.
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: Option<String>,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = api_key
            .filter(|k| !k.trim().is_empty())
            .map(|k| format!("Bearer {}", k));
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = request
            .messages
            .iter()
            .map(OpenAiMessage::from_domain)
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, DomainError> {
        let auth = self
            .auth_header
            .as_deref()
            .ok_or_else(|| DomainError::configuration("OpenAI API key is not configured"))?;

        Ok(vec![
            ("Authorization", auth),
            ("Content-Type", "application/json"),
        ])
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("openai", "No choices in response"))?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());

        let mut llm_response = LlmResponse::new(response.id, response.model, message);

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(parse_finish_reason(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response = llm_response.with_usage(Usage::new(
                usage.prompt_tokens,
                usage.completion_tokens,
            ));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let headers = self.headers()?;
        let url = self.chat_completions_url();
        let body = self.build_request(model, &request);
        let response = self.client.post_json(&url, headers, &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        Self {
            role,
            content: message.content_text().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn request() -> LlmRequest {
        LlmRequest::builder()
            .system("Answer only from the context")
            .user("What is AOMA?")
            .temperature(0.2)
            .max_tokens(600)
            .build()
    }

    #[tokio::test]
    async fn test_openai_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": "AOMA is the asset manager."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 8}
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, Some("sk-test".to_string()));

        let response = provider.chat("gpt-4o-mini", request()).await.unwrap();

        assert_eq!(response.content(), "AOMA is the asset manager.");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 48);
    }

    #[tokio::test]
    async fn test_request_body_and_auth() {
        let mock_response = serde_json::json!({
            "id": "x", "model": "m",
            "choices": [{"message": {"content": "ok"}, "finish_reason": null}]
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, Some("sk-test".to_string()));

        provider.chat("gpt-4o-mini", request()).await.unwrap();

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is AOMA?");
        assert_eq!(body["max_tokens"], 600);
        assert_eq!(
            provider.client.last_header("authorization").as_deref(),
            Some("Bearer sk-test")
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = MockHttpClient::new();
        let provider = OpenAiProvider::new(client, None);

        let err = provider.chat("gpt-4o-mini", request()).await.unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
        assert_eq!(provider.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_no_choices_is_error() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"id": "x", "model": "m", "choices": []}),
        );
        let provider = OpenAiProvider::new(client, Some("sk-test".to_string()));

        let err = provider.chat("gpt-4o-mini", request()).await.unwrap_err();

        assert!(err.to_string().contains("No choices"));
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let client = MockHttpClient::new().with_response(
            "http://localhost:8080/v1/chat/completions",
            serde_json::json!({
                "id": "x", "model": "m",
                "choices": [{"message": {"content": "ok"}}]
            }),
        );
        let provider = OpenAiProvider::with_base_url(
            client,
            Some("sk-test".to_string()),
            "http://localhost:8080/",
        );

        let response = provider.chat("local-model", request()).await.unwrap();

        assert_eq!(response.content(), "ok");
    }
}
