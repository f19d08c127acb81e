use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use imagegen_replicate::api::JobClientError;
use imagegen_replicate::messages::JobStatus;
use imagegen_replicate::service::JobService;

/// One scripted status response.
#[derive(Debug, Clone)]
pub enum Step {
    Status(JobStatus),
    /// Simulates a transport failure (surfaced as a 503).
    Unavailable,
}

/// In-memory [`JobService`] that replays scripted status responses per
/// job id. The last step of a script repeats forever.
#[derive(Default)]
pub struct ScriptedService {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fetches: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, job_id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), steps.into());
        self
    }

    /// Times at which status was fetched, in call order.
    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl JobService for ScriptedService {
    async fn submit(&self, _prompt: &str) -> Result<String, JobClientError> {
        Ok("job".to_string())
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, JobClientError> {
        self.fetches
            .lock()
            .unwrap()
            .push((job_id.to_string(), Instant::now()));

        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(job_id).expect("job id should be scripted");
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().expect("script should not be empty")
            }
        };

        match step {
            Step::Status(status) => Ok(status),
            Step::Unavailable => Err(JobClientError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            }),
        }
    }
}
