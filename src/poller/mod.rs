//! Poll-until-terminal driver for scan jobs.
//!
//! Owns the polling lifecycle: a single outstanding request per job, a
//! fixed inter-poll delay, a hard attempt ceiling, and deterministic
//! cancellation. The first terminal response wins regardless of which
//! endpoint produced it; the handoff to the result transformer happens
//! exactly once.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::StatusSource;
use crate::config::AppConfig;
use crate::errors::ScanError;
use crate::models::report::NormalizedReport;
use crate::models::scan::{ScanJob, ScanStatus, SERVICE_NAMES};
use crate::services::progress::{self, ProgressView};
use crate::services::report;

/// Polling knobs. Defaults mirror the production behavior: 3 s between
/// polls, 120 attempts (6 minutes), deprecated results shim off.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub legacy_fallback: bool,
    pub legacy_grace: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: 120,
            legacy_fallback: false,
            legacy_grace: Duration::from_millis(1000),
        }
    }
}

impl From<&AppConfig> for PollConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts,
            legacy_fallback: config.legacy_results_fallback,
            legacy_grace: config.legacy_grace(),
        }
    }
}

/// Terminal outcome of a polling session.
#[derive(Debug)]
pub enum ScanOutcome {
    /// All services finished; full report available.
    Completed {
        job: ScanJob,
        report: NormalizedReport,
    },
    /// Some services failed; the report covers what succeeded.
    Partial {
        job: ScanJob,
        report: NormalizedReport,
    },
    /// The job itself failed server-side.
    Failed { job: ScanJob, message: String },
}

impl ScanOutcome {
    pub fn status(&self) -> ScanStatus {
        match self {
            Self::Completed { .. } => ScanStatus::Completed,
            Self::Partial { .. } => ScanStatus::Partial,
            Self::Failed { .. } => ScanStatus::Failed,
        }
    }

    fn from_job(job: ScanJob) -> Self {
        match job.status {
            ScanStatus::Partial => {
                let report = report::transform(&job.services);
                Self::Partial { job, report }
            }
            ScanStatus::Failed => {
                let failures: Vec<String> = job
                    .failed_services()
                    .map(|(name, error)| format!("{name}: {error}"))
                    .collect();
                let message = if failures.is_empty() {
                    "scan failed server-side".to_string()
                } else {
                    failures.join("; ")
                };
                Self::Failed { job, message }
            }
            // Completed, and the backstop for anything else that claims
            // to be terminal.
            _ => {
                let report = report::transform(&job.services);
                Self::Completed { job, report }
            }
        }
    }
}

/// Drives one scan job to a terminal state.
#[derive(Debug)]
pub struct PollDriver<S> {
    source: S,
    config: PollConfig,
}

impl<S: StatusSource> PollDriver<S> {
    pub fn new(source: S, config: PollConfig) -> Self {
        Self { source, config }
    }

    /// Poll until terminal, cancelled, or out of budget.
    ///
    /// Every primary fetch consumes one attempt, whether it succeeded
    /// with a non-terminal status or failed in transport; retryable
    /// failures are absorbed and only ever surface as `Timeout` once
    /// the budget runs out. `on_progress` fires once per successful
    /// status response. Cancelling the token (or dropping the returned
    /// future) stops the session with no further fetches or callbacks.
    pub async fn run(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(ProgressView) + Send,
    ) -> Result<ScanOutcome, ScanError> {
        if job_id.is_empty() {
            return Err(ScanError::Invalid("job id must not be empty".to_string()));
        }

        let started = tokio::time::Instant::now();
        let mut attempts: u32 = 0;
        let mut last_status: Option<ScanStatus> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            match self.source.fetch_status(job_id).await {
                Ok(job) => {
                    if let Some(previous) = last_status {
                        if !ScanStatus::is_valid_transition(previous, job.status) {
                            tracing::warn!(
                                job_id,
                                previous = %previous,
                                current = %job.status,
                                "status regressed between polls"
                            );
                        }
                    }
                    last_status = Some(job.status);

                    on_progress(progress::project(&job.progress, &SERVICE_NAMES));

                    if job.status.is_terminal() {
                        tracing::info!(job_id, status = %job.status, "scan reached terminal state");
                        return Ok(ScanOutcome::from_job(job));
                    }
                }
                Err(err @ ScanError::NotFound(_)) => return Err(err),
                Err(err) if err.is_retryable() => {
                    tracing::debug!(job_id, error = %err, "poll failed, will retry");
                }
                Err(err) => return Err(err),
            }

            attempts += 1;
            if attempts >= self.config.max_attempts {
                tracing::warn!(job_id, attempts, "attempt budget exhausted");
                return Err(ScanError::Timeout { attempts });
            }

            // Deprecated results shim: consulted only once the grace
            // period has elapsed while the primary stays non-terminal.
            // Its failures are absorbed and it never consumes attempts.
            if self.config.legacy_fallback && started.elapsed() >= self.config.legacy_grace {
                match self.source.fetch_results(job_id).await {
                    Ok(job) if job.status.is_terminal() => {
                        tracing::info!(job_id, status = %job.status, "legacy results endpoint answered first");
                        on_progress(progress::project(&job.progress, &SERVICE_NAMES));
                        return Ok(ScanOutcome::from_job(job));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(job_id, error = %err, "legacy results fetch failed")
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ScanError::Cancelled),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}
