//! Async job driver: upload → wait for ready → invoke → validate.
//!
//! This is the only stage with timing semantics. The readiness loop sleeps
//! between status queries (never spins) and is bounded by
//! [`ReviewConfig::processing_timeout`]. Once the file is ready, the single
//! generation call has no deadline of its own: a hung backend blocks the
//! run, which is an accepted limitation of the sequential design.
//!
//! ## No retries
//!
//! Every failure is terminal for the current document. A remote file that
//! timed out is abandoned, not deleted; the Files API expires it on its own.
//! The only tolerance is inside the poll loop: one failed status query is
//! logged and the next tick queries again, since the deadline bounds it anyway.

use crate::backend::{AnalysisBackend, AnalysisRequest, RemoteFile};
use crate::config::ReviewConfig;
use crate::error::AnalysisError;
use crate::pipeline::input::Document;
use crate::pipeline::job::{AnalysisJob, JobState};
use crate::pipeline::schema::{validate, AnalysisRecord};
use crate::prompts::{RESPONSE_MIME_TYPE, USER_PROMPT};
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Run one document through the full analysis job.
pub async fn run_analysis(
    document: &Document,
    backend: &dyn AnalysisBackend,
    config: &ReviewConfig,
) -> Result<AnalysisRecord, AnalysisError> {
    let start = Instant::now();

    // ── Upload ───────────────────────────────────────────────────────────
    let file = backend
        .upload(document)
        .await
        .map_err(|e| AnalysisError::Upload {
            reason: e.to_string(),
        })?;
    info!(
        "Uploaded '{}' to {} as {}",
        document.display_name,
        backend.name(),
        file.name
    );

    let _release = ReleaseOnDrop {
        backend,
        file: file.clone(),
    };

    // ── Wait for readiness ───────────────────────────────────────────────
    let mut job = AnalysisJob::new(file);
    wait_until_ready(
        &mut job,
        backend,
        config.poll_interval(),
        config.processing_timeout(),
    )
    .await?;
    debug!(
        "File {} ready after {} status queries ({:?})",
        job.file.name,
        job.polls,
        job.created_at.elapsed()
    );

    // ── Invoke ───────────────────────────────────────────────────────────
    let request = AnalysisRequest {
        model: &config.model,
        system_instruction: config.system_instruction(),
        user_prompt: USER_PROMPT,
        response_mime_type: RESPONSE_MIME_TYPE,
    };
    let raw = backend
        .generate(&job.file, &request)
        .await
        .map_err(|e| AnalysisError::Backend {
            reason: e.to_string(),
        })?;
    if raw.trim().is_empty() {
        return Err(AnalysisError::Backend {
            reason: "backend returned an empty response".to_string(),
        });
    }
    debug!("Received {} bytes of analysis", raw.len());

    // ── Validate ─────────────────────────────────────────────────────────
    let record = validate(&raw)?;
    info!(
        "Analysis of '{}' complete in {}ms",
        document.display_name,
        start.elapsed().as_millis()
    );
    Ok(record)
}

/// Poll the backend until the job's file is ready, failed, or the deadline passes.
///
/// The first query is issued immediately; subsequent queries are spaced by
/// `interval`. Both the queries and the waits between them are cut off at
/// the deadline. On success the job is left in [`JobState::Ready`].
pub async fn wait_until_ready(
    job: &mut AnalysisJob,
    backend: &dyn AnalysisBackend,
    interval: Duration,
    timeout: Duration,
) -> Result<(), AnalysisError> {
    let deadline = job.created_at + timeout;

    loop {
        if Instant::now() >= deadline {
            return Err(expire(job, timeout));
        }

        match timeout_at(deadline, backend.status(&job.file)).await {
            Err(_) => return Err(expire(job, timeout)),
            Ok(Ok(status)) => match job.observe(status) {
                JobState::Ready => return Ok(()),
                JobState::Failed => {
                    return Err(AnalysisError::Processing {
                        file: job.file.name.clone(),
                    })
                }
                state => debug!("File {}: {:?} (poll {})", job.file.name, state, job.polls),
            },
            Ok(Err(e)) => warn!("Status query for {} failed: {}", job.file.name, e),
        }

        sleep_until((Instant::now() + interval).min(deadline)).await;
    }
}

/// Hands an uploaded file back to its backend when the job ends, including
/// when the job's future is dropped by an interrupt.
struct ReleaseOnDrop<'a> {
    backend: &'a dyn AnalysisBackend,
    file: RemoteFile,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.backend.release(&self.file);
    }
}

fn expire(job: &mut AnalysisJob, timeout: Duration) -> AnalysisError {
    job.expire();
    warn!(
        "File {} not ready after {}s; abandoning",
        job.file.name,
        timeout.as_secs()
    );
    AnalysisError::Timeout {
        file: job.file.name.clone(),
        secs: timeout.as_secs(),
    }
}
