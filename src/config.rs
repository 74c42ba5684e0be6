//! Configuration for resume extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. One struct per run makes it easy to share a
//! config across concurrent uploads and to log exactly what a run used.

use crate::error::ResumeError;
use crate::pipeline::llm::StructuredExtractor;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_JOB_ROLE;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use resume_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .job_role("Backend Engineer")
///     .model("gpt-4.1-mini")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.job_role, "Backend Engineer");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Target job role the prompt is framed around. Default: "Data Scientist".
    ///
    /// An empty string switches the prompt to "for any general position".
    pub job_role: String,

    /// LLM model identifier. If None, "gpt-4.1-nano" is used for named providers.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extraction backend. Takes precedence over every
    /// provider setting; used for tests and custom transports.
    pub extractor: Option<Arc<dyn StructuredExtractor>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Kept low so two runs over the same resume produce the same fields.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a failed model call. Default: 0 (no retry).
    /// At most [`MAX_RETRIES_LIMIT`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Pages processed at once. Default: 1 (sequential).
    ///
    /// Results are assembled in page order regardless of this value.
    pub concurrency: usize,

    /// Per-call timeout for the model request in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom instruction template. `{job_context}` is substituted.
    pub system_prompt: Option<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            job_role: DEFAULT_JOB_ROLE.to_string(),
            model: None,
            provider_name: None,
            provider: None,
            extractor: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            concurrency: 1,
            api_timeout_secs: 60,
            password: None,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("job_role", &self.job_role)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "extractor",
                &self.extractor.as_ref().map(|_| "<dyn StructuredExtractor>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn job_role(mut self, role: impl Into<String>) -> Self {
        self.config.job_role = role.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn StructuredExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ResumeError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ResumeError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ResumeError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(ResumeError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        if c.max_tokens == 0 {
            return Err(ResumeError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
