//! Batch orchestration: task list in, one outcome per started task out.
//!
//! ```text
//! DocumentTask ─▶ resolve ─▶ run_analysis ─▶ transform ─▶ PageWriter::write
//!                 (upload)   (poll/invoke/     (pure)       (one attempt)
//!                             validate)
//! ```
//!
//! Documents are processed strictly one after another. A failure at any
//! stage becomes a [`Outcome::Failed`] for that document and the loop moves
//! on; nothing short of an interrupt stops the batch.
//!
//! ## Interrupts
//!
//! [`ReviewPipeline::process_batch_until`] races each document against a
//! `watch` flag. When the flag turns `true` the in-flight document future is
//! dropped (its outcome is [`Outcome::Cancelled`]), no further task starts,
//! and the report is marked interrupted. Dropping mid-poll is safe: the only
//! state lost is a remote file the backend expires on its own.

use crate::backend::AnalysisBackend;
use crate::config::ReviewConfig;
use crate::error::ErrorKind;
use crate::notion::properties::build_properties;
use crate::notion::{PageProperties, PageWriter};
use crate::output::{failure_message, BatchReport, Outcome};
use crate::pipeline::blocks::transform;
use crate::pipeline::driver::run_analysis;
use crate::pipeline::input::{resolve_document, DocumentInput};
use crate::source::PaperPair;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// One paper to review and file.
#[derive(Debug, Clone)]
pub struct DocumentTask {
    /// Paper identifier used in outcomes and logs (the BibTeX key).
    pub id: String,
    pub properties: PageProperties,
    pub document: DocumentInput,
}

impl DocumentTask {
    /// Build a task from a scanned pair; the PDF is read when its turn comes.
    pub fn from_pair(pair: &PaperPair) -> Self {
        Self {
            id: pair.metadata.bib_key.clone(),
            properties: build_properties(&pair.metadata),
            document: DocumentInput::File(pair.pdf_path.clone()),
        }
    }
}

/// The analysis backend, the page writer, and the settings they run with.
pub struct ReviewPipeline {
    backend: Arc<dyn AnalysisBackend>,
    writer: Arc<dyn PageWriter>,
    config: ReviewConfig,
}

impl ReviewPipeline {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        writer: Arc<dyn PageWriter>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            backend,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Run one task through every stage. Never fails; failures are outcomes.
    pub async fn process_document(&self, task: &DocumentTask) -> Outcome {
        let document = match resolve_document(&task.document).await {
            Ok(d) => d,
            Err(reason) => return fail(task, ErrorKind::Upload, reason),
        };

        let record = match run_analysis(&document, self.backend.as_ref(), &self.config).await {
            Ok(r) => r,
            Err(e) => return fail(task, ErrorKind::from(&e), e),
        };

        let nodes = transform(&record);
        debug!("{}: {} content nodes", task.id, nodes.len());

        match self.writer.write(&task.properties, &nodes).await {
            Ok(page_id) => {
                info!("{}: created page {}", task.id, page_id);
                Outcome::Success {
                    document_id: task.id.clone(),
                    page_id,
                }
            }
            Err(e) => fail(task, ErrorKind::Write, e),
        }
    }

    /// Process every task in order.
    pub async fn process_batch(&self, tasks: &[DocumentTask]) -> BatchReport {
        let (_never, interrupt) = watch::channel(false);
        self.process_batch_until(tasks, interrupt).await
    }

    /// Process tasks in order until `interrupt` becomes `true`.
    pub async fn process_batch_until(
        &self,
        tasks: &[DocumentTask],
        mut interrupt: watch::Receiver<bool>,
    ) -> BatchReport {
        let total = tasks.len();
        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_batch_start(total);
        }

        let mut report = BatchReport::default();
        for (idx, task) in tasks.iter().enumerate() {
            let index = idx + 1;
            if *interrupt.borrow() {
                report.interrupted = true;
                report.not_started = total - idx;
                break;
            }

            info!("[{}/{}] Processing {}", index, total, task.id);
            if let Some(cb) = progress {
                cb.on_document_start(index, total, &task.id);
            }

            let outcome = tokio::select! {
                biased;
                _ = interrupted(&mut interrupt) => {
                    warn!("{}: cancelled by interrupt", task.id);
                    report.interrupted = true;
                    Outcome::Cancelled { document_id: task.id.clone() }
                }
                outcome = self.process_document(task) => outcome,
            };

            if let Some(cb) = progress {
                match &outcome {
                    Outcome::Success { .. } => cb.on_document_complete(index, total, &task.id),
                    Outcome::Failed { message, .. } => {
                        cb.on_document_error(index, total, &task.id, message)
                    }
                    Outcome::Cancelled { .. } => {
                        cb.on_document_error(index, total, &task.id, "cancelled")
                    }
                }
            }
            report.outcomes.push(outcome);

            if report.interrupted {
                report.not_started = total - index;
                break;
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed, {} cancelled, {} not started",
            report.succeeded(),
            report.failed(),
            report.cancelled(),
            report.not_started
        );
        if let Some(cb) = progress {
            cb.on_batch_complete(total, report.succeeded());
        }
        report
    }
}

/// Log a stage failure and turn it into the document's outcome.
fn fail(task: &DocumentTask, kind: ErrorKind, reason: impl std::fmt::Display) -> Outcome {
    let message = failure_message(&task.id, kind, reason);
    warn!("{}", message);
    Outcome::Failed {
        document_id: task.id.clone(),
        kind,
        message,
    }
}

/// Resolves once the flag is `true`. A dropped sender never interrupts.
async fn interrupted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
