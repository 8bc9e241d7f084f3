//! Error types for the paper2notion library.
//!
//! Two layers of errors reflect two distinct failure scopes:
//!
//! * [`ReviewError`] — **Fatal**: the run cannot start at all (bad
//!   configuration, provider not configured, unreadable BibTeX file).
//!   Returned as `Err(ReviewError)` from setup functions.
//!
//! * [`AnalysisError`] / [`SchemaError`] / [`WriteError`] — **Per-document**:
//!   one paper failed at one stage. These never cross the batch boundary;
//!   the orchestrator converts them into a failed
//!   [`crate::output::Outcome`] and moves on to the next paper.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2notion library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A directory or file given by the user does not exist.
    #[error("Path not found: '{path}'\nCheck the path exists and is readable.")]
    PathNotFound { path: PathBuf },

    /// A path exists but has the wrong kind (file vs. directory).
    #[error("'{path}' is not a {expected}")]
    WrongPathKind { path: PathBuf, expected: &'static str },

    /// The BibTeX file could not be read or contained no usable entry.
    #[error("Failed to parse BibTeX file '{path}': {detail}")]
    BibTex { path: PathBuf, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or credential validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a raw analysis payload was rejected by [`crate::pipeline::schema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The payload is not a single JSON object.
    #[error("response is not a JSON object: {detail}")]
    Malformed { detail: String },

    /// A required key is absent, null, or blank.
    #[error("required field '{field}' is missing or empty")]
    MissingField { field: &'static str },

    /// A required key holds a non-string value.
    #[error("required field '{field}' is not a string")]
    InvalidType { field: &'static str },
}

impl SchemaError {
    /// Stable machine-readable reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            SchemaError::Malformed { .. } => "malformed",
            SchemaError::MissingField { .. } => "missing_field",
            SchemaError::InvalidType { .. } => "invalid_type",
        }
    }

    /// The offending field, when the failure is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaError::Malformed { .. } => None,
            SchemaError::MissingField { field } | SchemaError::InvalidType { field } => Some(field),
        }
    }
}

/// A failure reported by an [`crate::backend::AnalysisBackend`] call.
///
/// Backends only describe *what* went wrong; the job driver decides which
/// stage the failure belongs to.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendFailure {
    pub message: String,
    /// HTTP status, when the failure came from an HTTP response.
    pub status: Option<u16>,
}

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Terminal failure of one document's analysis job.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The document was unreadable or the backend rejected the upload.
    #[error("upload failed: {reason}")]
    Upload { reason: String },

    /// The uploaded file never became ready before the deadline.
    #[error("file '{file}' still processing after {secs}s")]
    Timeout { file: String, secs: u64 },

    /// The backend reported that processing the file failed.
    #[error("backend reported processing failure for file '{file}'")]
    Processing { file: String },

    /// The generation call produced no usable response.
    #[error("analysis request failed: {reason}")]
    Backend { reason: String },

    /// The response did not satisfy the six-field schema.
    #[error("invalid analysis response: {0}")]
    Schema(#[from] SchemaError),
}

/// Failure of the destination-store write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The request never produced an HTTP response.
    #[error("request to Notion failed: {0}")]
    Http(String),

    /// Notion answered with a non-success status.
    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Notion accepted the request but returned no page id.
    #[error("page created but no id returned in response")]
    MissingPageId,

    /// The page was created but appending its remaining blocks failed; the
    /// page exists in Notion with only part of the review.
    #[error("page {page_id} created but left incomplete: {source}")]
    Incomplete {
        page_id: String,
        #[source]
        source: Box<WriteError>,
    },
}

/// The pipeline stage a failed document stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Upload,
    Timeout,
    Processing,
    Backend,
    Schema,
    Write,
}

impl ErrorKind {
    /// Human-readable stage label used in outcome messages.
    pub fn stage(&self) -> &'static str {
        match self {
            ErrorKind::Upload => "upload",
            ErrorKind::Timeout | ErrorKind::Processing => "processing",
            ErrorKind::Backend => "analysis",
            ErrorKind::Schema => "validation",
            ErrorKind::Write => "notion write",
        }
    }
}

impl From<&AnalysisError> for ErrorKind {
    fn from(e: &AnalysisError) -> Self {
        match e {
            AnalysisError::Upload { .. } => ErrorKind::Upload,
            AnalysisError::Timeout { .. } => ErrorKind::Timeout,
            AnalysisError::Processing { .. } => ErrorKind::Processing,
            AnalysisError::Backend { .. } => ErrorKind::Backend,
            AnalysisError::Schema(_) => ErrorKind::Schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_reason_tags() {
        let e = SchemaError::MissingField { field: "next_steps" };
        assert_eq!(e.reason(), "missing_field");
        assert_eq!(e.field(), Some("next_steps"));

        let e = SchemaError::Malformed {
            detail: "expected value".into(),
        };
        assert_eq!(e.reason(), "malformed");
        assert_eq!(e.field(), None);
    }

    #[test]
    fn schema_error_display_names_field() {
        let e = AnalysisError::from(SchemaError::MissingField { field: "novelty" });
        assert!(e.to_string().contains("novelty"), "got: {e}");
    }

    #[test]
    fn timeout_display() {
        let e = AnalysisError::Timeout {
            file: "files/abc".into(),
            secs: 300,
        };
        let msg = e.to_string();
        assert!(msg.contains("300s"), "got: {msg}");
        assert!(msg.contains("files/abc"), "got: {msg}");
    }

    #[test]
    fn error_kind_from_analysis_error() {
        let e = AnalysisError::Processing { file: "f".into() };
        assert_eq!(ErrorKind::from(&e), ErrorKind::Processing);
        let e = AnalysisError::Schema(SchemaError::InvalidType { field: "summary" });
        assert_eq!(ErrorKind::from(&e), ErrorKind::Schema);
    }

    #[test]
    fn notion_api_error_display() {
        let e = WriteError::Api {
            status: 400,
            code: "validation_error".into(),
            message: "body failed validation".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("validation_error"));
    }

    #[test]
    fn incomplete_write_names_page_and_cause() {
        let e = WriteError::Incomplete {
            page_id: "59833787-2cf9-4fdf-8782-e53db20768a5".into(),
            source: Box::new(WriteError::Http("connection reset".into())),
        };
        let msg = e.to_string();
        assert!(msg.contains("59833787-2cf9-4fdf-8782-e53db20768a5"));
        assert!(msg.contains("connection reset"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
