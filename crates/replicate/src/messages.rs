//! Prediction service request and response types.
//!
//! The service exposes two endpoints:
//!
//! - `POST /api/prediction` with `{"model", "version", "input": {"prompt"}}`,
//!   answering `{"id": "..."}`.
//! - `GET /api/poll?id=<id>`, answering
//!   `{"status": "...", "output": [...], "error": "..."}`.

use serde::{Deserialize, Serialize};

/// Body of a `POST /api/prediction` request.
#[derive(Debug, Serialize)]
pub struct PredictionRequest<'a> {
    pub model: &'a str,
    pub version: &'a str,
    pub input: PredictionInput<'a>,
}

/// Model input carried by a prediction request.
#[derive(Debug, Serialize)]
pub struct PredictionInput<'a> {
    pub prompt: &'a str,
}

/// Response returned after a prediction was accepted.
#[derive(Debug, Deserialize)]
pub struct PredictionResponse {
    /// Server-assigned job identifier. May be blank.
    #[serde(default)]
    pub id: String,
}

/// Raw response of `GET /api/poll`.
///
/// `output` and `error` are frequently `null` or absent while a job is
/// in progress.
#[derive(Debug, Deserialize)]
pub struct PollResponse {
    pub status: String,
    #[serde(default)]
    pub output: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Coarse job state as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Succeeded,
    Failed,
    /// Any other status string (`starting`, `processing`, ...).
    InProgress(String),
}

impl JobState {
    pub fn parse(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            other => Self::InProgress(other.to_string()),
        }
    }
}

/// Decoded status of a job at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Output URLs in service order; empty unless succeeded.
    pub outputs: Vec<String>,
    /// Error text reported alongside a failure.
    pub error: Option<String>,
}

impl JobStatus {
    pub fn in_progress(status: impl Into<String>) -> Self {
        Self {
            state: JobState::InProgress(status.into()),
            outputs: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: JobState::Succeeded,
            outputs: outputs.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed,
            outputs: Vec::new(),
            error: Some(error.into()),
        }
    }
}

impl From<PollResponse> for JobStatus {
    fn from(raw: PollResponse) -> Self {
        Self {
            state: JobState::parse(&raw.status),
            outputs: raw.output.unwrap_or_default(),
            error: raw.error.filter(|e| !e.is_empty()),
        }
    }
}
