//! Analysis backends: where a document is uploaded and reviewed.
//!
//! The job driver in [`crate::pipeline::driver`] only knows the three-call
//! shape of an asynchronous analysis service:
//!
//! ```text
//! upload(document) ──▶ status(file)* ──▶ generate(file, request)
//!                      (until ACTIVE)
//! ```
//!
//! Two implementations ship with the crate:
//!
//! * [`gemini::GeminiBackend`] — the Gemini Files API. Upload returns a
//!   remote file that is `PROCESSING` for a few seconds before it can be
//!   referenced in a `generateContent` call.
//! * [`llm::LlmBackend`] — any provider supported by `edgequake-llm`. There
//!   is no remote file: "upload" keeps the base64 document locally and the
//!   file is immediately `ACTIVE`.
//!
//! Tests drive the pipeline with scripted implementations of the same trait.

pub mod gemini;
pub mod llm;

use crate::error::BackendFailure;
use crate::pipeline::input::Document;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Processing state of an uploaded file, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteState {
    Processing,
    Active,
    Failed,
    /// Any state string the client does not recognise.
    Other(String),
}

impl RemoteState {
    /// Map a Files API state string.
    pub fn parse(s: &str) -> Self {
        match s {
            "PROCESSING" => RemoteState::Processing,
            "ACTIVE" => RemoteState::Active,
            "FAILED" => RemoteState::Failed,
            other => RemoteState::Other(other.to_string()),
        }
    }
}

/// Opaque handle to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Backend resource name, e.g. `files/abc123`.
    pub name: String,
    /// URI to reference the file from a generation request.
    pub uri: Option<String>,
    pub mime_type: String,
    /// State reported at upload time.
    pub state: RemoteState,
}

/// The fixed instruction payload of one analysis request.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub model: &'a str,
    pub system_instruction: &'a str,
    pub user_prompt: &'a str,
    /// MIME type the response must be returned as.
    pub response_mime_type: &'a str,
}

/// An asynchronous document-analysis service.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Short name used in logs ("gemini", "openai", …).
    fn name(&self) -> &str;

    /// Submit the document and return a handle to it.
    async fn upload(&self, document: &Document) -> Result<RemoteFile, BackendFailure>;

    /// Query the current processing state of an uploaded file.
    async fn status(&self, file: &RemoteFile) -> Result<RemoteState, BackendFailure>;

    /// Run one structured-generation request against a ready file and return
    /// the raw response text.
    async fn generate(
        &self,
        file: &RemoteFile,
        request: &AnalysisRequest<'_>,
    ) -> Result<String, BackendFailure>;

    /// Drop any local hold on an uploaded file once its job is over.
    ///
    /// Called exactly once per uploaded file, whether the job succeeded,
    /// failed, or was dropped mid-flight. Remote files are left to expire.
    fn release(&self, file: &RemoteFile) {
        let _ = file;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_files_api_states() {
        assert_eq!(RemoteState::parse("ACTIVE"), RemoteState::Active);
        assert_eq!(RemoteState::parse("PROCESSING"), RemoteState::Processing);
        assert_eq!(RemoteState::parse("FAILED"), RemoteState::Failed);
        assert_eq!(
            RemoteState::parse("STATE_UNSPECIFIED"),
            RemoteState::Other("STATE_UNSPECIFIED".into())
        );
    }
}
