//! Events emitted while prompts are processed.
//!
//! Published on a [`tokio::sync::broadcast`] channel owned by the
//! coordinator. Presentation layers (e.g. a server-sent-event endpoint)
//! subscribe to stream attempt completions as they happen. With no
//! subscribers, events are dropped.

use serde::Serialize;
use tokio::sync::broadcast;

use imagegen_core::outcome::AttemptResult;
use imagegen_core::result::PromptResult;
use imagegen_core::types::RequestId;

/// Broadcast channel capacity for generation events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A pipeline-level event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The service accepted an attempt's submission.
    AttemptSubmitted {
        request_id: RequestId,
        attempt: usize,
        job_id: String,
    },

    /// An attempt reached a terminal outcome. Emitted in arrival order.
    AttemptFinished {
        request_id: RequestId,
        result: AttemptResult,
    },

    /// All attempts for a prompt have reported.
    PromptCompleted { result: PromptResult },
}

impl GenerationEvent {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::AttemptSubmitted { request_id, .. } | Self::AttemptFinished { request_id, .. } => {
                *request_id
            }
            Self::PromptCompleted { result } => result.request_id,
        }
    }
}

/// Publish an event, ignoring the absence of subscribers.
pub(crate) fn publish(tx: &broadcast::Sender<GenerationEvent>, event: GenerationEvent) {
    // A SendError only means there are zero receivers.
    let _ = tx.send(event);
}
