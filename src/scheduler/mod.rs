//! # Batch Scheduler Boundary
//!
//! The engine never waits on job completion: submission returns immediately
//! with a [`JobId`] and completion is observed by polling [`JobState`] once
//! per tick. [`SchedulerContext`] is the opaque handle constructed once per
//! driver invocation and passed through to the task manager on every fire and
//! status check.

pub mod slurm;
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use slurm::SlurmClient;
pub use stub::SchedulerStub;

/// Scheduler-assigned identity for one submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the engine hands the scheduler for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub name: String,
    pub command_line: String,
    pub partition: Option<String>,
}

/// Execution states reported by the scheduler, in Slurm's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completing,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    NodeFail,
    Preempted,
}

impl std::str::FromStr for JobState {
    type Err = String;

    /// Parses `sacct` state output. Cancellations are reported with a
    /// trailing actor ("CANCELLED by 1234"), so match on the leading token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().split_whitespace().next().unwrap_or("");
        match token {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "COMPLETING" => Ok(Self::Completing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" | "OUT_OF_MEMORY" | "BOOT_FAIL" | "DEADLINE" => Ok(Self::Failed),
            "CANCELLED" | "REVOKED" => Ok(Self::Cancelled),
            "TIMEOUT" => Ok(Self::Timeout),
            "NODE_FAIL" => Ok(Self::NodeFail),
            "PREEMPTED" | "REQUEUED" | "SUSPENDED" | "RESIZING" => Ok(Self::Preempted),
            _ => Err(format!("Unrecognized scheduler state: {s}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job submission failed: {0}")]
    Submission(String),
    #[error("status query failed for job {job}: {message}")]
    Query { job: JobId, message: String },
    #[error("unparseable scheduler response: {0}")]
    Parse(String),
    #[error("scheduler process error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for the external batch scheduler. Submission must be non-blocking
/// relative to the job's actual completion.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn submit_job(&self, submission: &JobSubmission) -> Result<JobId, SchedulerError>;

    async fn job_status(&self, job: JobId) -> Result<JobState, SchedulerError>;
}

/// Opaque per-invocation handle to the scheduler, shared read-only across
/// every machine advanced in one driver tick.
#[derive(Clone)]
pub struct SchedulerContext {
    client: Arc<dyn SchedulerClient>,
}

impl SchedulerContext {
    pub fn new(client: Arc<dyn SchedulerClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn SchedulerClient {
        self.client.as_ref()
    }
}
