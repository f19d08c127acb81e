//! REST client for the prediction service.
//!
//! Wraps the two HTTP endpoints (job submission, status retrieval) using
//! [`reqwest`]. Every call is a single best-effort exchange: there is no
//! retry or backoff here, the poller owns all timing policy.

use imagegen_core::config::ServiceConfig;
use imagegen_core::outcome::FailureKind;

use crate::messages::{JobStatus, PollResponse, PredictionInput, PredictionRequest, PredictionResponse};

/// HTTP client for a single prediction service.
#[derive(Debug, Clone)]
pub struct PredictionApi {
    client: reqwest::Client,
    base_url: String,
    model: String,
    version: String,
}

/// Errors from the prediction REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum JobClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Prediction API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("Failed to decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service accepted the submission but returned a blank job id.
    #[error("No job id found in response")]
    EmptyId,
}

impl JobClientError {
    /// Classify this error within the attempt failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyId => FailureKind::EmptyId,
            Self::Request(_) | Self::Api { .. } | Self::Decode { .. } => FailureKind::Transport,
        }
    }
}

impl PredictionApi {
    /// Create a client from service configuration, building a dedicated
    /// [`reqwest::Client`] with the configured request timeout.
    pub fn new(config: &ServiceConfig) -> Result<Self, JobClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across services).
    pub fn with_client(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            version: config.version.clone(),
        }
    }

    /// Base HTTP URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation request for `prompt`.
    ///
    /// Sends `POST /api/prediction` carrying the configured model and
    /// version. Returns the server-assigned job id, or
    /// [`JobClientError::EmptyId`] when the id is blank.
    pub async fn submit_prediction(&self, prompt: &str) -> Result<String, JobClientError> {
        let body = PredictionRequest {
            model: &self.model,
            version: &self.version,
            input: PredictionInput { prompt },
        };

        let response = self
            .client
            .post(format!("{}/api/prediction", self.base_url))
            .json(&body)
            .send()
            .await?;

        let parsed: PredictionResponse = Self::parse_response(response).await?;
        let id = parsed.id.trim();
        if id.is_empty() {
            return Err(JobClientError::EmptyId);
        }
        Ok(id.to_string())
    }

    /// Retrieve the current status of a job.
    ///
    /// Sends `GET /api/poll?id=<job_id>`.
    pub async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, JobClientError> {
        let response = self
            .client
            .get(format!("{}/api/poll", self.base_url))
            .query(&[("id", job_id)])
            .send()
            .await?;

        let raw: PollResponse = Self::parse_response(response).await?;
        Ok(JobStatus::from(raw))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`JobClientError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, JobClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(JobClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, JobClientError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        let parsed = serde_json::from_str::<T>(&body);
        parsed.map_err(|source| JobClientError::Decode { source, body })
    }
}
