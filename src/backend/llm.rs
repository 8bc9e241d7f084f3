//! Inline analysis backend over any `edgequake-llm` provider.
//!
//! Chat-completion providers (OpenAI, Anthropic, Gemini via the chat API, …)
//! have no separate upload step. This backend emulates the three-call shape
//! locally: [`upload`](AnalysisBackend::upload) encodes the document and
//! parks it under a synthetic `inline/N` name, the file is `ACTIVE` at once,
//! and [`generate`](AnalysisBackend::generate) takes the attachment back out
//! and sends a single chat request. A job that ends before generation (a
//! timeout, or an interrupt dropping the document) hands the attachment back
//! through [`release`](AnalysisBackend::release).
//!
//! There is no retry loop here. A failed chat call fails the document.

use crate::backend::{AnalysisBackend, AnalysisRequest, RemoteFile, RemoteState};
use crate::config::ReviewConfig;
use crate::error::{BackendFailure, ReviewError};
use crate::pipeline::encode::encode_document;
use crate::pipeline::input::Document;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Attachments parked between `upload` and `generate`, keyed by handle.
///
/// Locked synchronously so a handle can be released from a `Drop`.
#[derive(Default)]
struct Staging {
    entries: Mutex<HashMap<String, ImageData>>,
}

impl Staging {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, ImageData>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, name: String, data: ImageData) {
        self.entries().insert(name, data);
    }

    fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    fn take(&self, name: &str) -> Option<ImageData> {
        self.entries().remove(name)
    }
}

/// Analysis backend that sends the document inline in one chat request.
pub struct LlmBackend {
    label: String,
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    staged: Staging,
    next_id: AtomicU64,
}

impl LlmBackend {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ReviewConfig) -> Self {
        Self {
            label: config
                .provider_name
                .clone()
                .unwrap_or_else(|| "llm".to_string()),
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            staged: Staging::default(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build the backend from the provider settings in `config`.
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ReviewError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AnalysisBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn upload(&self, document: &Document) -> Result<RemoteFile, BackendFailure> {
        let data = encode_document(document);
        let name = format!("inline/{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.staged.put(name.clone(), data);

        Ok(RemoteFile {
            name,
            uri: None,
            mime_type: document.mime_type.clone(),
            state: RemoteState::Active,
        })
    }

    async fn status(&self, file: &RemoteFile) -> Result<RemoteState, BackendFailure> {
        if self.staged.contains(&file.name) {
            Ok(RemoteState::Active)
        } else {
            Err(BackendFailure::new(format!(
                "no staged document named '{}'",
                file.name
            )))
        }
    }

    async fn generate(
        &self,
        file: &RemoteFile,
        request: &AnalysisRequest<'_>,
    ) -> Result<String, BackendFailure> {
        let data = self.staged.take(&file.name).ok_or_else(|| {
            BackendFailure::new(format!("no staged document named '{}'", file.name))
        })?;

        let messages = vec![
            ChatMessage::system(request.system_instruction),
            ChatMessage::user_with_images(request.user_prompt, vec![data]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| BackendFailure::new(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            file.name, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn release(&self, file: &RemoteFile) {
        if self.staged.take(&file.name).is_some() {
            debug!("Released unused attachment {}", file.name);
        }
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`; the
///    factory reads the matching API key from the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &ReviewConfig) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReviewError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReviewError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
