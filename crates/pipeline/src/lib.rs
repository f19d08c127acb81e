//! Fan-out orchestration over the prediction service.
//!
//! For each prompt the [`FanOutCoordinator`] launches a fixed number of
//! independent submit + poll attempts, funnels their terminal results
//! through a bounded channel, and aggregates them into one
//! [`PromptResult`](imagegen_core::result::PromptResult) once every
//! attempt has reported.

pub mod aggregator;
pub mod attempt;
pub mod coordinator;
pub mod events;

pub use coordinator::FanOutCoordinator;
pub use events::GenerationEvent;

use imagegen_core::error::CoreError;

/// Errors surfaced by the pipeline.
///
/// Attempt-level failures never appear here; they are folded into the
/// prompt's `failed_count`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input was rejected before any attempt was launched.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The coordinator was shut down before all attempts reported.
    #[error("Pipeline cancelled before all attempts reported")]
    Cancelled,
}
