//! Drives one submitted job through status checks to a terminal state.
//!
//! The poll loop runs on two independent timers: an interval ticker that
//! paces status requests and a deadline measured from submission. Each
//! iteration waits on whichever fires first; the deadline wins ties. A
//! [`CancellationToken`] lets the owner abandon a pending job, which stops
//! the ticker and returns [`PollCancelled`].

use std::time::Duration;

use imagegen_core::config::GenerationConfig;
use imagegen_core::outcome::PollOutcome;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::messages::{JobState, JobStatus};
use crate::service::JobService;

/// Timing parameters for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay before the first status check and between subsequent checks.
    pub interval: Duration,
    /// Maximum time from submission to a terminal service status.
    pub deadline: Duration,
}

impl From<&GenerationConfig> for PollerConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            interval: config.poll_interval,
            deadline: config.deadline,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

/// A job accepted by the service. Immutable once created.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub prompt: String,
    pub submitted_at: Instant,
}

impl Job {
    /// Record a job submitted just now.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            submitted_at: Instant::now(),
        }
    }
}

/// Returned when the owner abandons a job that was still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("poll loop cancelled before a terminal state")]
pub struct PollCancelled;

/// Interpret one status response.
///
/// Returns `None` when the job should stay pending. A success with no
/// outputs stays pending because the service can report success before
/// the output list is populated. Only the first output is kept.
pub fn evaluate_status(status: &JobStatus) -> Option<PollOutcome> {
    match &status.state {
        JobState::Succeeded => status.outputs.first().map(|url| PollOutcome::Succeeded {
            output: url.clone(),
        }),
        JobState::Failed => Some(PollOutcome::Failed {
            reason: status.error.clone().unwrap_or_default(),
        }),
        JobState::InProgress(_) => None,
    }
}

/// `start + delay`, saturating at roughly thirty years instead of
/// overflowing the clock.
fn after(start: Instant, delay: Duration) -> Instant {
    start
        .checked_add(delay)
        .unwrap_or_else(|| start + Duration::from_secs(86_400 * 365 * 30))
}

/// Runs poll loops with a fixed timing configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller {
    config: PollerConfig,
}

impl Poller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll `job` until it reaches a terminal state, the deadline passes,
    /// or `cancel` fires.
    ///
    /// A failed status request ends the loop immediately with
    /// [`PollOutcome::TransportError`]; it is not retried.
    pub async fn run(
        &self,
        service: &dyn JobService,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, PollCancelled> {
        let deadline = tokio::time::sleep_until(after(job.submitted_at, self.config.deadline));
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval_at(
            after(job.submitted_at, self.config.interval),
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut polls: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %job.id, polls, "Poll loop cancelled");
                    return Err(PollCancelled);
                }
                _ = &mut deadline => {
                    return Ok(self.timed_out(job, polls));
                }
                _ = ticker.tick() => {}
            }

            polls += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %job.id, polls, "Poll loop cancelled mid-request");
                    return Err(PollCancelled);
                }
                _ = &mut deadline => {
                    return Ok(self.timed_out(job, polls));
                }
                result = service.fetch_status(&job.id) => result,
            };

            let status = match result {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, polls, error = %e, "Status request failed");
                    return Ok(PollOutcome::TransportError {
                        reason: e.to_string(),
                    });
                }
            };

            match evaluate_status(&status) {
                Some(outcome) => {
                    tracing::info!(
                        job_id = %job.id,
                        polls,
                        elapsed_ms = job.submitted_at.elapsed().as_millis() as u64,
                        state = ?status.state,
                        "Job reached terminal state",
                    );
                    return Ok(outcome);
                }
                None => {
                    if status.state == JobState::Succeeded {
                        tracing::debug!(job_id = %job.id, polls, "Succeeded without outputs, still polling");
                    } else {
                        tracing::debug!(job_id = %job.id, polls, state = ?status.state, "Job still in progress");
                    }
                }
            }
        }
    }

    fn timed_out(&self, job: &Job, polls: u32) -> PollOutcome {
        tracing::warn!(
            job_id = %job.id,
            polls,
            deadline_secs = self.config.deadline.as_secs(),
            "Job timed out",
        );
        PollOutcome::TimedOut
    }
}
