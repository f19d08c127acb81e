//! Per-prompt aggregation of attempt outcomes.
//!
//! [`PromptAccumulator`] folds [`AttemptResult`]s in arrival order and
//! produces an immutable [`PromptResult`] once the fan-out has reported.
//! The accumulator is owned by a single task; attempts hand their results
//! to it by message passing, never by shared mutation.

use chrono::Utc;
use serde::Serialize;

use crate::outcome::AttemptResult;
use crate::types::{RequestId, Timestamp};

/// The aggregate of all attempts launched for one prompt.
///
/// Invariant: `outputs.len() + failed_count == attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptResult {
    pub request_id: RequestId,
    pub prompt: String,
    /// Output URLs of successful attempts, in completion order.
    pub outputs: Vec<String>,
    /// Attempts that ended in any failure state, including attempts that
    /// never reported.
    pub failed_count: usize,
    /// Number of attempts launched (the fan-out factor).
    pub attempts: usize,
    pub completed_at: Timestamp,
}

impl PromptResult {
    /// Aggregate a complete set of attempt results.
    ///
    /// `attempts` is the number launched; if fewer results are supplied the
    /// shortfall is counted as failed.
    pub fn from_attempts(
        request_id: RequestId,
        prompt: impl Into<String>,
        attempts: usize,
        results: impl IntoIterator<Item = AttemptResult>,
    ) -> Self {
        let mut acc = PromptAccumulator::new(request_id, prompt, attempts);
        for result in results {
            acc.record(result);
        }
        acc.finish()
    }

    /// `true` when no attempt produced an output.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Collects attempt results for one prompt until all have reported.
#[derive(Debug)]
pub struct PromptAccumulator {
    request_id: RequestId,
    prompt: String,
    expected: usize,
    received: usize,
    outputs: Vec<String>,
    failed_count: usize,
}

impl PromptAccumulator {
    pub fn new(request_id: RequestId, prompt: impl Into<String>, expected: usize) -> Self {
        Self {
            request_id,
            prompt: prompt.into(),
            expected,
            received: 0,
            outputs: Vec::with_capacity(expected),
            failed_count: 0,
        }
    }

    /// Fold one attempt result into the aggregate.
    ///
    /// Results beyond the expected count are ignored so the invariant
    /// cannot be broken by a misbehaving producer.
    pub fn record(&mut self, result: AttemptResult) {
        if self.is_complete() {
            return;
        }
        self.received += 1;
        match result.output() {
            Some(url) => self.outputs.push(url.to_string()),
            None => self.failed_count += 1,
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }

    /// Produce the final result. Attempts that never reported count as
    /// failed.
    pub fn finish(self) -> PromptResult {
        let missing = self.expected - self.received;
        PromptResult {
            request_id: self.request_id,
            prompt: self.prompt,
            outputs: self.outputs,
            failed_count: self.failed_count + missing,
            attempts: self.expected,
            completed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
