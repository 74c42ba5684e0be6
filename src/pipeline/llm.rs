//! The external model boundary: one trait, one provider-backed implementation,
//! and the timeout/retry policy wrapped around every call.
//!
//! Everything the pipeline knows about the model is [`StructuredExtractor`]:
//! prompt + schema in, raw text out. The concrete provider (OpenAI, Anthropic,
//! Ollama, … via `edgequake-llm`) is chosen by [`resolve_extractor`] and can
//! be replaced by any implementation, which is how the tests drive the
//! pipeline without network access.
//!
//! ## Retry Strategy
//!
//! Retries are opt-in (`max_retries`, default 0). When enabled the delay is
//! `retry_backoff_ms * 2^(attempt-1)`: 500 ms → 1 s → 2 s with the defaults,
//! never more than [`MAX_BACKOFF_MS`].
//! Every attempt is bounded by `api_timeout_secs` so a stuck page cannot hang
//! the whole request.

use crate::config::ExtractionConfig;
use crate::error::{PageError, ResumeError};
use crate::prompts::{ExtractionRequest, SCHEMA_NAME};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Longest single wait between retries.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Raw reply of the external model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    /// Text expected (but not guaranteed) to be JSON matching the schema.
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Failure of a single model call.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Network, authentication or provider-side failure.
    #[error("{0}")]
    Call(String),
}

/// Prompt + schema in, raw text out.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ModelReply, ExtractorError>;
}

/// [`StructuredExtractor`] backed by an `edgequake-llm` chat provider.
///
/// The instructions and the schema travel in the system message; the resume
/// text is the user turn.
pub struct LlmExtractor {
    provider: Arc<dyn LLMProvider>,
}

impl LlmExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StructuredExtractor for LlmExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ModelReply, ExtractorError> {
        let messages = vec![
            ChatMessage::system(system_message(request)),
            ChatMessage::user(request.input.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractorError::Call(e.to_string()))?;

        Ok(ModelReply {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// System message: instructions followed by the schema the reply must match.
fn system_message(request: &ExtractionRequest) -> String {
    let schema = serde_json::to_string_pretty(&request.schema).unwrap_or_default();
    format!(
        "{}\n\nThe response must be a single JSON object conforming to this JSON Schema ({}):\n{}",
        request.instructions, SCHEMA_NAME, schema
    )
}

/// Run one page's request under the configured timeout and retry policy.
///
/// Returns the reply together with the number of retries it took.
pub async fn call_extractor(
    extractor: &Arc<dyn StructuredExtractor>,
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> Result<(ModelReply, u32), PageError> {
    let page_num = request.page_num;
    let limit = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<PageError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(limit, extractor.extract(request)).await {
            Ok(Ok(reply)) => {
                debug!(
                    "Page {}: {} input tokens, {} output tokens",
                    page_num, reply.input_tokens, reply.output_tokens
                );
                return Ok((reply, attempt));
            }
            Ok(Err(e)) => {
                warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                last_err = Some(PageError::ExtractionFailed {
                    page: page_num,
                    retries: attempt,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "Page {}: attempt {} timed out after {}s",
                    page_num,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(PageError::Timeout {
                    page: page_num,
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or(PageError::ExtractionFailed {
        page: page_num,
        retries: config.max_retries,
        detail: "Unknown error".to_string(),
    }))
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped at
/// [`MAX_BACKOFF_MS`].
pub fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base_ms.saturating_mul(factor))
        .min(MAX_BACKOFF_MS)
}

/// Resolve the extraction backend, from most-specific to least-specific.
///
/// 1. **Pre-built extractor** (`config.extractor`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in [`LlmExtractor`].
/// 3. **Named provider + model** (`config.provider_name`).
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **OpenAI** when `OPENAI_API_KEY` is set.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_extractor(
    config: &ExtractionConfig,
) -> Result<Arc<dyn StructuredExtractor>, ResumeError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmExtractor::new(provider)))
}

fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ResumeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ResumeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ResumeError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ResumeError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::build_request;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times, then answers.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StructuredExtractor for Flaky {
        async fn extract(&self, _request: &ExtractionRequest) -> Result<ModelReply, ExtractorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ExtractorError::Call("503 Service Unavailable".into()))
            } else {
                Ok(ModelReply::text("{}"))
            }
        }
    }

    struct Stuck;

    #[async_trait]
    impl StructuredExtractor for Stuck {
        async fn extract(&self, _request: &ExtractionRequest) -> Result<ModelReply, ExtractorError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(ModelReply::default())
        }
    }

    fn request() -> ExtractionRequest {
        build_request(1, "Jane Doe jane@x.com", "Data Scientist", None, 0.1, 512)
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let flaky: Arc<dyn StructuredExtractor> = Arc::new(Flaky {
            failures: 1,
            calls: AtomicU32::new(0),
        });
        let config = ExtractionConfig::default();
        let err = call_extractor(&flaky, &request(), &config).await.unwrap_err();
        assert!(matches!(err, PageError::ExtractionFailed { page: 1, retries: 0, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let flaky: Arc<dyn StructuredExtractor> = Arc::new(Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let config = ExtractionConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let (reply, retries) = call_extractor(&flaky, &request(), &config).await.unwrap();
        assert_eq!(reply.content, "{}");
        assert_eq!(retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_call_times_out() {
        let stuck: Arc<dyn StructuredExtractor> = Arc::new(Stuck);
        let config = ExtractionConfig::builder().api_timeout_secs(5).build().unwrap();
        let err = call_extractor(&stuck, &request(), &config).await.unwrap_err();
        assert_eq!(err, PageError::Timeout { page: 1, secs: 5 });
    }

    #[test]
    fn backoff_doubles_then_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1_000);
        assert_eq!(backoff_ms(500, 3), 2_000);
        assert_eq!(backoff_ms(500, 57), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(500, 65), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(1, u32::MAX), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(0, 40), 0);
    }

    #[test]
    fn system_message_carries_schema() {
        let msg = system_message(&request());
        assert!(msg.contains("for the job role: Data Scientist"));
        assert!(msg.contains("\"work_experience\""));
        assert!(msg.contains(SCHEMA_NAME));
    }

    #[test]
    fn explicit_extractor_wins() {
        let stuck: Arc<dyn StructuredExtractor> = Arc::new(Stuck);
        let config = ExtractionConfig::builder()
            .extractor(Arc::clone(&stuck))
            .provider_name("definitely-not-a-provider")
            .build()
            .unwrap();
        assert!(resolve_extractor(&config).is_ok());
    }
}
