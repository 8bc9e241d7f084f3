//! Paper sources: where (metadata, PDF) pairs come from.
//!
//! Two layouts are supported:
//!
//! * **Directory scan** ([`scan`]): one `.bib` and one `.pdf` per paper
//!   directory, or a single directory holding both.
//! * **Zotero export** ([`zotero`]): one `.bib` file whose entries carry a
//!   `file = {PDF:<path>:application/pdf}` attachment field.
//!
//! Both produce [`PaperPair`]s. The orchestrator never sees this module; it
//! receives [`crate::review::DocumentTask`]s built from the pairs.

pub mod bibtex;
pub mod scan;
pub mod zotero;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bibliographic metadata for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// BibTeX citation key; also the document id in outcomes.
    pub bib_key: String,
    pub title: String,
    pub authors: Vec<String>,
    /// Publication year, only when within 1900–2100.
    pub year: Option<i32>,
    /// Paper URL, only when it is an http(s) URL.
    pub url: Option<String>,
    pub doi: Option<String>,
}

/// Metadata paired with the PDF it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperPair {
    pub metadata: PaperMetadata,
    pub pdf_path: PathBuf,
}
