//! Per-document outcomes and the batch report.
//!
//! Every task handed to the orchestrator that was *started* produces exactly
//! one [`Outcome`]. Tasks never started because the run was interrupted
//! produce none; they are only counted in [`BatchReport::not_started`].

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Identifier of a page created in the destination store.
pub type PageId = String;

/// Final result of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Analysis validated and the page was written.
    Success { document_id: String, page_id: PageId },

    /// The document stopped at one stage. `message` names the document, the
    /// stage, and the reason.
    Failed {
        document_id: String,
        kind: ErrorKind,
        message: String,
    },

    /// The run was interrupted while this document was in flight.
    Cancelled { document_id: String },
}

/// `<document>: <stage> failed: <reason>`.
pub fn failure_message(document_id: &str, kind: ErrorKind, reason: impl std::fmt::Display) -> String {
    format!("{document_id}: {} failed: {reason}", kind.stage())
}

impl Outcome {
    /// Build a failed outcome with the standard message format.
    pub fn failed(document_id: &str, kind: ErrorKind, reason: impl std::fmt::Display) -> Self {
        Outcome::Failed {
            document_id: document_id.to_string(),
            kind,
            message: failure_message(document_id, kind, reason),
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            Outcome::Success { document_id, .. }
            | Outcome::Failed { document_id, .. }
            | Outcome::Cancelled { document_id } => document_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Everything a batch run produced, in task order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
    /// True when the run was stopped by an interrupt.
    pub interrupted: bool,
    /// Tasks that were never started.
    pub not_started: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Failed { .. }))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Cancelled { .. }))
            .count()
    }

    /// True when every task ran and succeeded.
    pub fn all_ok(&self) -> bool {
        !self.interrupted && self.not_started == 0 && self.failed() == 0 && self.cancelled() == 0
    }

    /// Process exit status for a CLI run: 0 all succeeded, 130 interrupted,
    /// 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            130
        } else if self.all_ok() {
            0
        } else {
            1
        }
    }
}
