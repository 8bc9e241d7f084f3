//! Input resolution: turn a task's document input into uploadable bytes.
//!
//! The scanning shell hands the pipeline either bytes it already holds or
//! the path of a PDF it discovered. Reading happens here, at the start of
//! the upload stage, so an unreadable or corrupt file fails only its own
//! document (as an upload error) instead of aborting the whole scan.

use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME type of every document the pipeline uploads.
pub const PDF_MIME: &str = "application/pdf";

/// A document as handed over by the caller.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    /// In-memory document bytes with a display name.
    Bytes { name: String, bytes: Vec<u8> },
    /// A PDF on disk, read lazily when the document's turn comes.
    File(PathBuf),
}

impl DocumentInput {
    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            DocumentInput::Bytes { name, .. } => name.clone(),
            DocumentInput::File(p) => p.display().to_string(),
        }
    }
}

/// A readable, non-empty document ready for upload.
#[derive(Debug, Clone)]
pub struct Document {
    pub display_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Resolve the input to a [`Document`].
///
/// Returns a human-readable reason on failure; the driver wraps it into an
/// upload error.
pub async fn resolve_document(input: &DocumentInput) -> Result<Document, String> {
    let document = match input {
        DocumentInput::Bytes { name, bytes } => Document {
            display_name: name.clone(),
            mime_type: PDF_MIME.to_string(),
            bytes: bytes.clone(),
        },
        DocumentInput::File(path) => read_local(path).await?,
    };

    check_document(&document)?;
    debug!(
        "Resolved document '{}' ({} bytes)",
        document.display_name,
        document.len()
    );
    Ok(document)
}

async fn read_local(path: &Path) -> Result<Document, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => format!("PDF file not found: '{}'", path.display()),
        std::io::ErrorKind::PermissionDenied => {
            format!("permission denied reading '{}'", path.display())
        }
        _ => format!("cannot read '{}': {e}", path.display()),
    })?;

    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "paper.pdf".to_string());

    Ok(Document {
        display_name,
        mime_type: PDF_MIME.to_string(),
        bytes,
    })
}

/// Reject empty payloads and files that are not PDFs.
fn check_document(document: &Document) -> Result<(), String> {
    if document.is_empty() {
        return Err(format!("document '{}' is empty", document.display_name));
    }
    if !document.bytes.starts_with(b"%PDF") {
        let head = &document.bytes[..document.len().min(4)];
        return Err(format!(
            "document '{}' is not a valid PDF (first bytes: {:?})",
            document.display_name, head
        ));
    }
    Ok(())
}
