//! `imagegen-worker` -- generate images for prompts given on the command
//! line.
//!
//! Each prompt is submitted several times to the prediction service; the
//! aggregated results are printed to stdout as JSON. Logs go to stderr.
//!
//! ```text
//! imagegen-worker "a cat on a mat" "a lighthouse at dusk"
//! ```
//!
//! Configuration comes from `IMAGEGEN_*` environment variables (see
//! [`GenerationConfig::from_env`]); a `.env` file is honoured.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagegen_core::config::GenerationConfig;
use imagegen_core::result::PromptResult;
use imagegen_pipeline::{FanOutCoordinator, PipelineError};
use imagegen_replicate::api::PredictionApi;

/// Exit status when no prompts were supplied.
const EXIT_USAGE: u8 = 2;
/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imagegen_worker=info,imagegen_pipeline=info,imagegen_replicate=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let prompts: Vec<String> = std::env::args().skip(1).collect();
    if prompts.is_empty() {
        tracing::error!("Usage: imagegen-worker <prompt>...");
        return Ok(ExitCode::from(EXIT_USAGE));
    }

    let config = GenerationConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        service_url = %config.service.base_url,
        model = %config.service.model,
        fan_out = config.fan_out,
        poll_interval_secs = config.poll_interval.as_secs(),
        deadline_secs = config.deadline.as_secs(),
        "Loaded generation configuration",
    );

    let api = PredictionApi::new(&config.service).context("Failed to build HTTP client")?;
    let coordinator = FanOutCoordinator::new(Arc::new(api), &config)
        .context("Failed to build coordinator")?;

    let finished = supervise(
        coordinator.run_batch(prompts.as_slice()),
        tokio::signal::ctrl_c(),
        || coordinator.shutdown(),
    )
    .await?;

    let Some(results) = finished else {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };
    for result in &results {
        if result.is_empty() {
            tracing::warn!(prompt = %result.prompt, "No images generated");
        }
    }
    let json = serde_json::to_string_pretty(&results).context("Failed to encode results")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Drive `batch` to completion unless `interrupt` fires first.
///
/// Returns `None` after an interrupt. If the interrupt listener itself
/// fails, the batch keeps running without it.
async fn supervise<B, S>(
    batch: B,
    interrupt: S,
    on_interrupt: impl FnOnce(),
) -> anyhow::Result<Option<Vec<PromptResult>>>
where
    B: Future<Output = Result<Vec<PromptResult>, PipelineError>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(batch);

    tokio::select! {
        result = &mut batch => Ok(Some(result.context("Batch failed")?)),
        signal = interrupt => match signal {
            Ok(()) => {
                tracing::warn!("Interrupted, abandoning pending jobs");
                on_interrupt();
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, running without it");
                Ok(Some(batch.await.context("Batch failed")?))
            }
        },
    }
}
