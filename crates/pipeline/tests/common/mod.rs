use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use imagegen_replicate::api::JobClientError;
use imagegen_replicate::messages::JobStatus;
use imagegen_replicate::service::JobService;

/// Scripted response to a submission.
#[derive(Debug, Clone)]
pub enum Submit {
    Id(&'static str),
    /// The service answers with a blank id.
    Blank,
    /// The request fails at the transport level.
    Unavailable,
    /// The attempt task dies without reporting.
    Panic,
}

/// Scripted response to a status request.
#[derive(Debug, Clone)]
pub enum Poll {
    Status(JobStatus),
    Unavailable,
}

/// In-memory prediction service.
///
/// Submissions consume the submit script in call order; status requests
/// consume the script registered for the job id. The last entry of every
/// script repeats forever. Jobs sharing an id share a script, so scripted
/// responses are handed out to whichever attempt asks first.
#[derive(Default)]
pub struct FakeService {
    submits: Mutex<VecDeque<Submit>>,
    polls: Mutex<HashMap<String, VecDeque<Poll>>>,
    submit_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeService {
    pub fn new(submits: Vec<Submit>) -> Self {
        Self {
            submits: Mutex::new(submits.into()),
            ..Self::default()
        }
    }

    pub fn poll_script(self, job_id: &str, steps: Vec<Poll>) -> Self {
        self.polls
            .lock()
            .unwrap()
            .insert(job_id.to_string(), steps.into());
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

fn next<T: Clone>(script: &mut VecDeque<T>) -> T {
    if script.len() > 1 {
        script.pop_front().unwrap()
    } else {
        script.front().cloned().expect("script should not be empty")
    }
}

fn unavailable() -> JobClientError {
    JobClientError::Api {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl JobService for FakeService {
    async fn submit(&self, _prompt: &str) -> Result<String, JobClientError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let step = next(&mut self.submits.lock().unwrap());
        match step {
            Submit::Id(id) => Ok(id.to_string()),
            Submit::Blank => Err(JobClientError::EmptyId),
            Submit::Unavailable => Err(unavailable()),
            Submit::Panic => panic!("scripted attempt panic"),
        }
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatus, JobClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut polls = self.polls.lock().unwrap();
            next(polls.get_mut(job_id).expect("job id should be scripted"))
        };
        match step {
            Poll::Status(status) => Ok(status),
            Poll::Unavailable => Err(unavailable()),
        }
    }
}
