//! Configuration types for a review run.
//!
//! All pipeline behaviour is controlled through [`ReviewConfig`], built via
//! its [`ReviewConfigBuilder`]. Credentials for the analysis backend and the
//! Notion workspace are deliberately *not* stored here: they are handed to
//! the backend / writer constructors so a config can be logged with `{:?}`
//! without leaking secrets.

use crate::error::ReviewError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini model used for paper analysis.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Configuration for a review run.
///
/// Built via [`ReviewConfig::builder()`] or using [`ReviewConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2notion::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .poll_interval_secs(5)
///     .processing_timeout_secs(600)
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_interval().as_secs(), 5);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Model identifier passed to the analysis backend. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Seconds between two readiness queries on an uploaded file. Default: 2.
    ///
    /// The Files API needs a few seconds to ingest a typical paper; polling
    /// faster only burns quota.
    pub poll_interval_secs: u64,

    /// Wall-clock limit for the readiness-poll loop, in seconds. Default: 300.
    ///
    /// Only the polling loop is bounded. The generation request that follows
    /// has no independent deadline.
    pub processing_timeout_secs: u64,

    /// Custom system instruction. If None, uses [`crate::prompts::SYSTEM_INSTRUCTION`].
    ///
    /// An override must still ask for the six-key JSON object, otherwise
    /// every response will fail schema validation.
    pub system_prompt: Option<String>,

    /// LLM provider name for the inline backend (e.g. "openai", "anthropic").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider for the inline backend. Takes precedence
    /// over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the inline backend. Default: 0.2.
    pub temperature: f32,

    /// Maximum output tokens for the inline backend. Default: 8192.
    ///
    /// Six dense sections for a long paper routinely exceed 4 000 tokens; a
    /// truncated answer is unparseable JSON and fails validation.
    pub max_tokens: usize,

    /// Per-document progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            poll_interval_secs: 2,
            processing_timeout_secs: 300,
            system_prompt: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("model", &self.model)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("processing_timeout_secs", &self.processing_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReviewProgressCallback>"),
            )
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    /// The system instruction in effect (override or built-in default).
    pub fn system_instruction(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::SYSTEM_INSTRUCTION)
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs.max(1);
        self
    }

    pub fn processing_timeout_secs(mut self, secs: u64) -> Self {
        self.config.processing_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
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

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ReviewError::InvalidConfig("Model must not be empty".into()));
        }
        if c.processing_timeout_secs == 0 {
            return Err(ReviewError::InvalidConfig(
                "Processing timeout must be ≥ 1s".into(),
            ));
        }
        if c.processing_timeout_secs < c.poll_interval_secs {
            return Err(ReviewError::InvalidConfig(format!(
                "Processing timeout ({}s) is shorter than the poll interval ({}s)",
                c.processing_timeout_secs, c.poll_interval_secs
            )));
        }
        if c.max_tokens == 0 {
            return Err(ReviewError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
