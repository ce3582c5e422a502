//! Context assembly and LLM answer synthesis with provider fallback

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::query::as_millis;
use crate::domain::search::VectorResult;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_synthesis_fallback;

/// Answer returned when the search stage found nothing
pub const EMPTY_RESULTS_ANSWER: &str = "No relevant information found in the knowledge base.";

const SYSTEM_PROMPT: &str = "You are a knowledge assistant for an internal engineering \
organization. Answer strictly from the provided context. If the context does not contain \
enough information to answer, say that you do not have enough information. Cite sources \
using their [n] markers.";

/// Tunables for context assembly and provider calls
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Hard deadline applied to each provider attempt
    pub deadline: Duration,
    pub per_result_chars: usize,
    pub total_context_chars: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            per_result_chars: 1000,
            total_context_chars: 6000,
            temperature: Some(0.2),
            max_tokens: Some(1024),
        }
    }
}

/// A provider paired with the model it should be asked for
#[derive(Debug, Clone)]
pub struct SynthesisTarget {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
}

impl SynthesisTarget {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// Generated answer
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub text: String,
    /// Provider that produced the text, `none` for the empty-results answer
    pub provider: String,
    pub fallback_used: bool,
    pub duration: Duration,
}

/// Concatenate results in rank order within the character budgets
pub fn build_context(results: &[VectorResult], per_result_chars: usize, total_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0usize;

    for (index, result) in results.iter().enumerate() {
        let excerpt: String = result.content.chars().take(per_result_chars).collect();
        let block = format!(
            "[{}] ({}:{})\n{}",
            index + 1,
            result.source_type,
            result.source_id,
            excerpt.trim()
        );

        let separator = if context.is_empty() { 0 } else { 2 };
        let block_chars = block.chars().count() + separator;

        if used + block_chars > total_chars {
            break;
        }

        if separator > 0 {
            context.push_str("\n\n");
        }
        context.push_str(&block);
        used += block_chars;
    }

    context
}

/// Fill the user prompt template
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nAnswer using only the context above.",
        context.trim(),
        query
    )
}

/// Primary/secondary LLM synthesis under a per-attempt deadline
#[derive(Debug)]
pub struct SynthesisEngine {
    primary: SynthesisTarget,
    secondary: Option<SynthesisTarget>,
    config: SynthesisConfig,
}

impl SynthesisEngine {
    pub fn new(primary: SynthesisTarget) -> Self {
        Self {
            primary,
            secondary: None,
            config: SynthesisConfig::default(),
        }
    }

    pub fn with_secondary(mut self, secondary: SynthesisTarget) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub async fn synthesize(
        &self,
        query: &str,
        results: &[VectorResult],
    ) -> Result<Synthesis, DomainError> {
        let started = Instant::now();

        if results.is_empty() {
            return Ok(Synthesis {
                text: EMPTY_RESULTS_ANSWER.to_string(),
                provider: "none".to_string(),
                fallback_used: false,
                duration: started.elapsed(),
            });
        }

        let context = build_context(
            results,
            self.config.per_result_chars,
            self.config.total_context_chars,
        );
        let request = self.request(&context, query);

        let primary_error = match self.attempt(&self.primary, request.clone()).await {
            Ok(text) => {
                return Ok(Synthesis {
                    text,
                    provider: self.primary.provider.provider_name().to_string(),
                    fallback_used: false,
                    duration: started.elapsed(),
                });
            }
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            return Err(DomainError::synthesis(format!(
                "Primary provider failed and no secondary is configured: {}",
                primary_error
            )));
        };

        tracing::warn!(
            primary = self.primary.provider.provider_name(),
            secondary = secondary.provider.provider_name(),
            error = %primary_error,
            "Primary synthesis failed, falling back"
        );
        record_synthesis_fallback();

        match self.attempt(secondary, request).await {
            Ok(text) => Ok(Synthesis {
                text,
                provider: secondary.provider.provider_name().to_string(),
                fallback_used: true,
                duration: started.elapsed(),
            }),
            Err(secondary_error) => Err(DomainError::synthesis(format!(
                "All providers failed (primary: {}; secondary: {})",
                primary_error, secondary_error
            ))),
        }
    }

    fn request(&self, context: &str, query: &str) -> LlmRequest {
        let mut builder = LlmRequest::builder()
            .system(SYSTEM_PROMPT)
            .user(build_prompt(context, query));

        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build()
    }

    async fn attempt(&self, target: &SynthesisTarget, request: LlmRequest) -> Result<String, DomainError> {
        let name = target.provider.provider_name();
        let started = Instant::now();

        // Dropping the timed-out future cancels the in-flight request
        let response = timeout(self.config.deadline, target.provider.chat(&target.model, request))
            .await
            .map_err(|_| {
                DomainError::timeout(format!("synthesis:{}", name), as_millis(self.config.deadline))
            })??;

        let text = response.content().trim();
        if text.is_empty() {
            return Err(DomainError::provider(name, "Empty completion"));
        }

        tracing::debug!(
            provider = name,
            model = %target.model,
            elapsed_ms = as_millis(started.elapsed()),
            "Synthesis attempt succeeded"
        );

        Ok(text.to_string())
    }
}
