//! The join point of a prompt's fan-out.
//!
//! Attempts send their terminal [`AttemptResult`] over a bounded channel
//! sized to the fan-out. [`collect_attempts`] is the single consumer: it
//! drains exactly `expected` messages into a [`PromptAccumulator`], so no
//! result sequence is ever shared between concurrent writers.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use imagegen_core::outcome::AttemptResult;
use imagegen_core::result::{PromptAccumulator, PromptResult};
use imagegen_core::types::RequestId;

use crate::events::{publish, GenerationEvent};
use crate::PipelineError;

/// Wait until `expected` attempts have reported, then build the prompt's
/// result.
///
/// If every sender is dropped before `expected` results arrive (an
/// attempt task ended without reporting), the missing attempts are counted
/// as failed. Returns [`PipelineError::Cancelled`] if `cancel` fires first.
pub async fn collect_attempts(
    request_id: RequestId,
    prompt: &str,
    expected: usize,
    mut rx: mpsc::Receiver<AttemptResult>,
    events: &broadcast::Sender<GenerationEvent>,
    cancel: &CancellationToken,
) -> Result<PromptResult, PipelineError> {
    let mut acc = PromptAccumulator::new(request_id, prompt, expected);

    while !acc.is_complete() {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            received = rx.recv() => received,
        };

        let Some(result) = received else {
            tracing::error!(
                %request_id,
                received = acc.received(),
                expected,
                "Attempt channel closed before all attempts reported",
            );
            break;
        };

        tracing::debug!(
            %request_id,
            attempt = result.attempt,
            success = result.is_success(),
            "Attempt reported",
        );
        publish(
            events,
            GenerationEvent::AttemptFinished {
                request_id,
                result: result.clone(),
            },
        );
        acc.record(result);
    }

    Ok(acc.finish())
}
