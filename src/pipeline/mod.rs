//! Pipeline stages for reviewing one paper.
//!
//! Each submodule implements exactly one step; the orchestrator in
//! [`crate::review`] chains them per document.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ driver ───────────────────────────────▶ blocks
//! (bytes)   upload → poll (job) → generate → schema  (content nodes)
//! ```
//!
//! 1. [`input`]  — read the PDF handed over by the scanner; reject empty or
//!    non-PDF payloads
//! 2. [`driver`] — the asynchronous job: upload, poll the [`job`] state
//!    machine until ready, issue the single generation request
//! 3. [`schema`] — validate the raw response against the six-field contract
//! 4. [`blocks`] — turn the validated record into headings, paragraphs and
//!    list items under the 2000-character ceiling
//!
//! [`encode`] base64-wraps a document for backends that take it inline.

pub mod blocks;
pub mod driver;
pub mod encode;
pub mod input;
pub mod job;
pub mod schema;
