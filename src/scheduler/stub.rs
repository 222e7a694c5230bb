//! Scriptable in-memory scheduler used by tests and local dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{JobId, JobState, JobSubmission, SchedulerClient, SchedulerError};

#[derive(Default)]
pub struct SchedulerStub {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, JobState>>,
    submissions: Mutex<Vec<JobSubmission>>,
}

impl SchedulerStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the state a job will report on the next poll.
    pub fn set_job_state(&self, job: JobId, state: JobState) {
        self.jobs.lock().insert(job, state);
    }

    /// Move every known job to `Completed`.
    pub fn complete_all(&self) {
        for state in self.jobs.lock().values_mut() {
            *state = JobState::Completed;
        }
    }

    pub fn submissions(&self) -> Vec<JobSubmission> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }
}

#[async_trait]
impl SchedulerClient for SchedulerStub {
    async fn submit_job(&self, submission: &JobSubmission) -> Result<JobId, SchedulerError> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.jobs.lock().insert(id, JobState::Pending);
        self.submissions.lock().push(submission.clone());
        Ok(id)
    }

    async fn job_status(&self, job: JobId) -> Result<JobState, SchedulerError> {
        self.jobs
            .lock()
            .get(&job)
            .copied()
            .ok_or(SchedulerError::Query {
                job,
                message: "unknown job".to_string(),
            })
    }
}
