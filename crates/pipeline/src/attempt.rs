//! A single submit + poll attempt.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use imagegen_core::outcome::AttemptResult;
use imagegen_core::types::RequestId;
use imagegen_replicate::poller::{Job, PollCancelled, Poller};
use imagegen_replicate::service::JobService;

use crate::events::{publish, GenerationEvent};

/// Identity of one attempt within a prompt's fan-out.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub request_id: RequestId,
    /// Zero-based attempt index.
    pub index: usize,
    pub prompt: &'a str,
}

/// Submit the prompt and, if a job id comes back, poll it to a terminal
/// state.
///
/// Every failure is absorbed into the returned [`AttemptResult`]. The only
/// error is cancellation, in which case nothing should be reported.
pub async fn run_attempt(
    service: &dyn JobService,
    poller: &Poller,
    attempt: Attempt<'_>,
    events: &broadcast::Sender<GenerationEvent>,
    cancel: &CancellationToken,
) -> Result<AttemptResult, PollCancelled> {
    let submitted = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PollCancelled),
        result = service.submit(attempt.prompt) => result,
    };

    let job_id = match submitted {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(
                request_id = %attempt.request_id,
                attempt = attempt.index,
                kind = %e.kind(),
                error = %e,
                "Submission failed",
            );
            return Ok(AttemptResult::submit_failed(
                attempt.index,
                attempt.prompt,
                e.kind(),
                e.to_string(),
            ));
        }
    };

    tracing::info!(
        request_id = %attempt.request_id,
        attempt = attempt.index,
        job_id = %job_id,
        "Prediction submitted",
    );
    publish(
        events,
        GenerationEvent::AttemptSubmitted {
            request_id: attempt.request_id,
            attempt: attempt.index,
            job_id: job_id.clone(),
        },
    );

    let job = Job::new(job_id, attempt.prompt);
    let outcome = poller.run(service, &job, cancel).await?;

    if let Some(kind) = outcome.failure_kind() {
        tracing::warn!(
            request_id = %attempt.request_id,
            attempt = attempt.index,
            job_id = %job.id,
            kind = %kind,
            "Attempt produced no output",
        );
    }

    Ok(AttemptResult::polled(attempt.index, job.prompt, job.id, outcome))
}
