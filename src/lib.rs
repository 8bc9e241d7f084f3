//! # paper2notion
//!
//! Review research papers with a multimodal LLM and file each structured
//! review as a page in a Notion database.
//!
//! ## Why this crate?
//!
//! Reading notes on a paper follow the same skeleton every time: what it
//! does, why it is new, how it was done, how it was validated, what is
//! debatable, what to read next. This crate asks a model for exactly those
//! six sections as one JSON object, validates the answer strictly, and turns
//! it into Notion blocks that fit the API's size limits, one paper at a time.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .bib + .pdf
//!  │
//!  ├─ 1. Scan      pair BibTeX entries with PDFs (directory or Zotero export)
//!  ├─ 2. Upload    send the PDF to the analysis backend
//!  ├─ 3. Poll      wait until the remote file is ACTIVE (2 s cadence, 300 s cap)
//!  ├─ 4. Generate  one JSON-mode request with the review instruction
//!  ├─ 5. Validate  six required string fields, nothing coerced
//!  ├─ 6. Transform headings + paragraphs / bullet lists, ≤ 2000 chars each
//!  └─ 7. Write     one Notion page per paper
//! ```
//!
//! A failure at any step fails only that paper; the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2notion::{
//!     scan_directory, DocumentTask, GeminiBackend, NotionWriter, ReviewConfig, ReviewPipeline,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = GeminiBackend::new(std::env::var("GEMINI_API_KEY")?)?;
//!     let writer = NotionWriter::new(
//!         std::env::var("NOTION_TOKEN")?,
//!         &std::env::var("NOTION_DATABASE_ID")?,
//!     )?;
//!     let pipeline = ReviewPipeline::new(Arc::new(backend), Arc::new(writer), ReviewConfig::default());
//!
//!     let tasks: Vec<DocumentTask> = scan_directory("papers".as_ref())?
//!         .iter()
//!         .map(DocumentTask::from_pair)
//!         .collect();
//!     let report = pipeline.process_batch(&tasks).await;
//!     eprintln!("{} of {} filed", report.succeeded(), tasks.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2notion` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2notion = { version = "0.1", default-features = false }
//! ```
//!
//! ## Backends
//!
//! | Backend | Transport | Notes |
//! |---------|-----------|-------|
//! | [`GeminiBackend`] | Gemini Files API | Default. Upload, poll, `generateContent` in JSON mode |
//! | [`LlmBackend`]    | `edgequake-llm`  | Any supported provider; PDF sent inline, no polling |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod notion;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::gemini::GeminiBackend;
pub use backend::llm::LlmBackend;
pub use backend::{AnalysisBackend, AnalysisRequest, RemoteFile, RemoteState};
pub use config::{ReviewConfig, ReviewConfigBuilder, DEFAULT_MODEL};
pub use error::{AnalysisError, BackendFailure, ErrorKind, ReviewError, SchemaError, WriteError};
pub use notion::{NotionWriter, PageProperties, PageWriter};
pub use output::{BatchReport, Outcome, PageId};
pub use pipeline::blocks::{transform, ContentNode};
pub use pipeline::driver::run_analysis;
pub use pipeline::input::{Document, DocumentInput};
pub use pipeline::schema::{validate, AnalysisRecord};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
pub use review::{DocumentTask, ReviewPipeline};
pub use source::scan::scan_directory;
pub use source::zotero::parse_zotero_bib_file;
pub use source::{PaperMetadata, PaperPair};
