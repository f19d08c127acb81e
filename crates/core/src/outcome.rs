//! Terminal outcomes of poll loops and generation attempts.
//!
//! A [`PollOutcome`] is produced exactly once per poll loop. An
//! [`AttemptOutcome`] additionally covers attempts that never reached the
//! poll stage because submission failed.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Why an attempt produced no usable output.
///
/// The aggregator treats every kind the same; the distinction exists for
/// logging and for presentation layers that want to explain a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network failure, non-success HTTP status, or undecodable body.
    Transport,
    /// The service accepted the submission but returned a blank job id.
    EmptyId,
    /// The service reported the job as failed.
    ServiceFailed,
    /// No terminal status was observed before the deadline.
    TimedOut,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::EmptyId => "empty_id",
            Self::ServiceFailed => "service_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PollOutcome
// ---------------------------------------------------------------------------

/// Terminal state of a single job's poll loop.
///
/// Only the first element of the service's output list is kept on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The service reported success with at least one output URL.
    Succeeded { output: String },
    /// The service reported failure, with its error text (possibly empty).
    Failed { reason: String },
    /// The deadline passed while the job was still pending.
    TimedOut,
    /// A status request failed at the transport or decode level.
    TransportError { reason: String },
}

impl PollOutcome {
    /// The output URL, if this outcome is a success.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Succeeded { output } => Some(output),
            _ => None,
        }
    }

    /// Failure classification, or `None` for a success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { .. } => Some(FailureKind::ServiceFailed),
            Self::TimedOut => Some(FailureKind::TimedOut),
            Self::TransportError { .. } => Some(FailureKind::Transport),
        }
    }
}

// ---------------------------------------------------------------------------
// AttemptOutcome / AttemptResult
// ---------------------------------------------------------------------------

/// Outcome of one submit + poll sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Submission failed; the job was never polled.
    SubmitFailed { kind: FailureKind, reason: String },
    /// Submission succeeded and the poll loop reached a terminal state.
    Polled { outcome: PollOutcome },
}

/// The terminal record of one attempt, handed from the attempt task to
/// the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptResult {
    /// Zero-based index of the attempt within its prompt's fan-out.
    pub attempt: usize,
    /// The prompt the attempt was created from.
    pub prompt: String,
    /// Service job id, when submission returned one.
    pub job_id: Option<String>,
    pub outcome: AttemptOutcome,
}

impl AttemptResult {
    /// Record an attempt whose poll loop terminated.
    pub fn polled(
        attempt: usize,
        prompt: impl Into<String>,
        job_id: impl Into<String>,
        outcome: PollOutcome,
    ) -> Self {
        Self {
            attempt,
            prompt: prompt.into(),
            job_id: Some(job_id.into()),
            outcome: AttemptOutcome::Polled { outcome },
        }
    }

    /// Record an attempt that failed before a job id was obtained.
    pub fn submit_failed(
        attempt: usize,
        prompt: impl Into<String>,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            prompt: prompt.into(),
            job_id: None,
            outcome: AttemptOutcome::SubmitFailed {
                kind,
                reason: reason.into(),
            },
        }
    }

    /// The output URL when the attempt succeeded.
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Polled { outcome } => outcome.output(),
            AttemptOutcome::SubmitFailed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.output().is_some()
    }

    /// Failure classification, or `None` when the attempt succeeded.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            AttemptOutcome::Polled { outcome } => outcome.failure_kind(),
            AttemptOutcome::SubmitFailed { kind, .. } => Some(*kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
