//! Per-prompt fan-out of independent generation attempts.
//!
//! [`FanOutCoordinator`] spawns `fan_out` attempt tasks for each prompt.
//! Attempts never affect one another: a failed or slow attempt only delays
//! its own prompt's join. The coordinator always waits for every attempt
//! rather than stopping at the first success, since multiple outputs per
//! prompt are wanted.
//!
//! Attempt events are broadcast on a [`tokio::sync::broadcast`] channel.
//! Call [`FanOutCoordinator::subscribe`] to receive them.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use imagegen_core::config::GenerationConfig;
use imagegen_core::error::CoreError;
use imagegen_core::result::PromptResult;
use imagegen_core::types::new_request_id;
use imagegen_replicate::poller::{Poller, PollerConfig};
use imagegen_replicate::service::JobService;

use crate::aggregator::collect_attempts;
use crate::attempt::{run_attempt, Attempt};
use crate::events::{publish, GenerationEvent, EVENT_CHANNEL_CAPACITY};
use crate::PipelineError;

/// Launches and joins generation attempts.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct FanOutCoordinator {
    service: Arc<dyn JobService>,
    poller: Poller,
    fan_out: usize,
    event_tx: broadcast::Sender<GenerationEvent>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl FanOutCoordinator {
    /// Build a coordinator from pipeline configuration.
    pub fn new(
        service: Arc<dyn JobService>,
        config: &GenerationConfig,
    ) -> Result<Self, CoreError> {
        Self::with_settings(service, Poller::new(PollerConfig::from(config)), config.fan_out)
    }

    /// Build a coordinator with an explicit poller and fan-out factor.
    pub fn with_settings(
        service: Arc<dyn JobService>,
        poller: Poller,
        fan_out: usize,
    ) -> Result<Self, CoreError> {
        if fan_out == 0 {
            return Err(CoreError::Validation(
                "fan-out must launch at least one attempt".into(),
            ));
        }
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            service,
            poller,
            fan_out,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Attempts launched per prompt.
    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Subscribe to attempt and prompt events.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.event_tx.subscribe()
    }

    /// Abandon all in-flight work.
    ///
    /// Pending pollers stop, and every unfinished `run_prompt` /
    /// `run_batch` call returns [`PipelineError::Cancelled`].
    pub fn shutdown(&self) {
        tracing::info!("Shutting down fan-out coordinator");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Process one prompt: run `fan_out` attempts concurrently and
    /// aggregate their outcomes once all have terminated.
    ///
    /// A prompt whose attempts all fail still yields an `Ok` result with no
    /// outputs.
    pub async fn run_prompt(&self, prompt: &str) -> Result<PromptResult, PipelineError> {
        validate_prompt(prompt)?;
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let request_id = new_request_id();
        let prompt_cancel = self.cancel.child_token();
        // Stops this prompt's attempts if the caller drops the future.
        let _guard = prompt_cancel.clone().drop_guard();

        tracing::info!(%request_id, fan_out = self.fan_out, prompt, "Processing prompt");

        let (tx, rx) = mpsc::channel(self.fan_out);
        for index in 0..self.fan_out {
            let tx = tx.clone();
            let service = Arc::clone(&self.service);
            let poller = self.poller;
            let prompt = prompt.to_string();
            let event_tx = self.event_tx.clone();
            let cancel = prompt_cancel.clone();

            tokio::spawn(async move {
                let attempt = Attempt {
                    request_id,
                    index,
                    prompt: &prompt,
                };
                match run_attempt(service.as_ref(), &poller, attempt, &event_tx, &cancel).await {
                    Ok(result) => {
                        // The receiver is gone only if the prompt was abandoned.
                        let _ = tx.send(result).await;
                    }
                    Err(_) => {
                        tracing::debug!(%request_id, attempt = index, "Attempt cancelled");
                    }
                }
            });
        }
        drop(tx);

        let result = collect_attempts(
            request_id,
            prompt,
            self.fan_out,
            rx,
            &self.event_tx,
            &prompt_cancel,
        )
        .await?;

        tracing::info!(
            %request_id,
            outputs = result.outputs.len(),
            failed = result.failed_count,
            "Prompt completed",
        );
        publish(
            &self.event_tx,
            GenerationEvent::PromptCompleted {
                result: result.clone(),
            },
        );

        Ok(result)
    }

    /// Process several prompts concurrently.
    ///
    /// Results are returned in input order. All prompts are validated
    /// before any attempt is launched.
    pub async fn run_batch<S: AsRef<str>>(
        &self,
        prompts: &[S],
    ) -> Result<Vec<PromptResult>, PipelineError> {
        for prompt in prompts {
            validate_prompt(prompt.as_ref())?;
        }

        tracing::info!(
            prompts = prompts.len(),
            attempts = prompts.len() * self.fan_out,
            "Processing batch",
        );

        try_join_all(prompts.iter().map(|p| self.run_prompt(p.as_ref()))).await
    }
}

fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be blank".into()));
    }
    Ok(())
}
