//! # Task Manager
//!
//! Mediates between the engine and the batch scheduler: fires (submits) tasks
//! and checks their status, translating scheduler job states into the shared
//! [`Status`] vocabulary. The retryable-vs-fatal mapping policy lives here,
//! never in the engine.
//!
//! Job-id correlation is bookkeeping internal to this adapter — the task
//! itself only carries name, status and timestamps. A task whose correlation
//! has been lost (e.g. across a process restart) resolves to `Suspended`, the
//! safe default, and waits for an operator retry signal.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::scheduler::{JobId, JobState, JobSubmission, SchedulerContext, SchedulerError};
use crate::state_machine::{Status, Task};
use crate::tasks::TaskKind;

#[derive(Debug, Error)]
pub enum TaskManagerError {
    #[error("task '{task}' has no unit of work to submit")]
    NotSubmittable { task: String },
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Fires and polls tasks on behalf of the engine.
///
/// `fire` must be non-blocking relative to the work's completion — submission
/// acceptance is not task completion. `check_status` must not fail the tick
/// for ordinary "still running" observations; when status cannot be
/// determined at all it returns `Suspended`.
#[async_trait]
pub trait TaskManager: Send + Sync {
    async fn fire(&self, task: &Task, ctx: &SchedulerContext) -> Result<(), TaskManagerError>;

    async fn check_status(&self, task: &Task, ctx: &SchedulerContext) -> Status;
}

/// Production task manager: scheduled kinds go to the batch scheduler, the
/// rest (sentinel files, review gates, metrics registration) are observed
/// in-process.
#[derive(Default)]
pub struct ScheduledTaskManager {
    jobs: DashMap<Uuid, JobId>,
}

impl ScheduledTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a scheduler job state onto the task status vocabulary.
    ///
    /// Infrastructure casualties (node failure, preemption, timeout) are
    /// judged transient and come back as `Retry`; everything the job itself
    /// did wrong is `Suspended` until an operator intervenes.
    pub fn map_job_state(state: JobState) -> Status {
        match state {
            JobState::Pending => Status::Queued,
            JobState::Running | JobState::Completing => Status::Running,
            JobState::Completed => Status::Complete,
            JobState::NodeFail | JobState::Preempted | JobState::Timeout => Status::Retry,
            JobState::Failed | JobState::Cancelled => Status::Suspended,
        }
    }
}

#[async_trait]
impl TaskManager for ScheduledTaskManager {
    async fn fire(&self, task: &Task, ctx: &SchedulerContext) -> Result<(), TaskManagerError> {
        if !task.kind.is_scheduled() {
            // Observed in-process; nothing to submit.
            debug!(task = %task.name, "task requires no scheduler submission");
            return Ok(());
        }

        let command_line = task
            .kind
            .command_line()
            .ok_or_else(|| TaskManagerError::NotSubmittable { task: task.name.clone() })?;
        let submission = JobSubmission {
            name: task.name.clone(),
            command_line,
            partition: None,
        };
        let job = ctx.client().submit_job(&submission).await?;
        self.jobs.insert(task.id, job);
        debug!(task = %task.name, job_id = %job, "task submitted to scheduler");
        Ok(())
    }

    async fn check_status(&self, task: &Task, ctx: &SchedulerContext) -> Status {
        match &task.kind {
            TaskKind::WaitForFile { path } => {
                if path.exists() {
                    Status::Complete
                } else {
                    Status::Running
                }
            }
            // Completes only via an operator mutation between ticks.
            TaskKind::WaitForReview { .. } => task.status,
            // Metrics registration is synchronous with the fire; the parse
            // itself is downstream of this engine.
            TaskKind::DemultiplexMetrics
            | TaskKind::AlignmentMetrics
            | TaskKind::FingerprintUpload => Status::Complete,
            _ => {
                let Some(job) = self.jobs.get(&task.id).map(|j| *j) else {
                    warn!(task = %task.name, "no job correlation for task; suspending");
                    return Status::Suspended;
                };
                match ctx.client().job_status(job).await {
                    Ok(state) => Self::map_job_state(state),
                    Err(error) => {
                        warn!(task = %task.name, job_id = %job, %error,
                              "scheduler status query failed; suspending");
                        Status::Suspended
                    }
                }
            }
        }
    }
}
