//! The seam between the pipeline and the prediction service.
//!
//! The poller and coordinator depend only on [`JobService`], so tests can
//! drive them with a scripted in-memory implementation.

use async_trait::async_trait;

use crate::api::{JobClientError, PredictionApi};
use crate::messages::JobStatus;

/// The two operations the pipeline needs from a prediction service.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit a generation request and return the job id.
    async fn submit(&self, prompt: &str) -> Result<String, JobClientError>;

    /// Fetch the current status of a previously submitted job.
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, JobClientError>;
}

#[async_trait]
impl JobService for PredictionApi {
    async fn submit(&self, prompt: &str) -> Result<String, JobClientError> {
        self.submit_prediction(prompt).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, JobClientError> {
        PredictionApi::fetch_status(self, job_id).await
    }
}
