//! Crate-level error rollup.

use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::{DriverError, EngineError, ResumeError};
use crate::scheduler::SchedulerError;
use crate::store::StoreError;
use crate::task_manager::TaskManagerError;

/// Umbrella error for callers that drive the whole service and do not care
/// which layer failed. Individual layers keep their own error types.
#[derive(Debug, Error)]
pub enum SeqflowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Resume(#[from] ResumeError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    TaskManager(#[from] TaskManagerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SeqflowError>;
