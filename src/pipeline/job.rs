//! Analysis job lifecycle as an explicit state machine.
//!
//! ```text
//!            status=PROCESSING/other
//!               ┌──────────┐
//!               ▼          │
//! UPLOADED ──▶ PROCESSING ─┴─▶ READY
//!    │             │ ╲
//!    │             │  ╲ status=FAILED ──▶ FAILED
//!    └─────────────┴── deadline ───────▶ TIMED_OUT
//! ```
//!
//! Transitions are a pure function of (state, event). The driver owns the
//! clock and the I/O; this module only decides what an observation means.

use crate::backend::{RemoteFile, RemoteState};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Uploaded,
    Processing,
    Ready,
    Failed,
    TimedOut,
}

/// Something the driver observed while waiting for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A status query returned this state.
    Status(RemoteState),
    /// The readiness deadline passed.
    DeadlineElapsed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Ready | JobState::Failed | JobState::TimedOut)
    }

    /// Next state after `event`. Terminal states absorb every event.
    pub fn next(self, event: &PollEvent) -> JobState {
        if self.is_terminal() {
            return self;
        }
        match event {
            PollEvent::Status(RemoteState::Active) => JobState::Ready,
            PollEvent::Status(RemoteState::Failed) => JobState::Failed,
            PollEvent::Status(RemoteState::Processing | RemoteState::Other(_)) => {
                JobState::Processing
            }
            PollEvent::DeadlineElapsed => JobState::TimedOut,
        }
    }
}

/// One in-flight analysis attempt. Never outlives a single document.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub file: RemoteFile,
    pub state: JobState,
    pub created_at: Instant,
    pub last_polled_at: Option<Instant>,
    pub polls: u32,
}

impl AnalysisJob {
    /// A freshly uploaded job.
    pub fn new(file: RemoteFile) -> Self {
        Self {
            file,
            state: JobState::Uploaded,
            created_at: Instant::now(),
            last_polled_at: None,
            polls: 0,
        }
    }

    /// Record a status observation and advance the state.
    pub fn observe(&mut self, status: RemoteState) -> JobState {
        self.last_polled_at = Some(Instant::now());
        self.polls += 1;
        self.state = self.state.next(&PollEvent::Status(status));
        self.state
    }

    /// Record that the deadline passed.
    pub fn expire(&mut self) -> JobState {
        self.state = self.state.next(&PollEvent::DeadlineElapsed);
        self.state
    }
}
