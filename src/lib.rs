//! # Seqflow
//!
//! Orchestration engine for sequencing-analysis pipelines. Each pipeline run
//! is a persisted [`state_machine::FiniteStateMachine`] whose tasks execute
//! out of process on a batch scheduler; the engine advances machines one tick
//! at a time, level-triggered, from whatever the store says their current
//! shape is.
//!
//! ## Architecture
//!
//! - [`state_machine`]: the serializable machine aggregate (states, tasks,
//!   transitions, statuses)
//! - [`engine`]: the single-tick stepper, resume guard, periodic driver and
//!   machine factory
//! - [`task_manager`]: translates tasks into scheduler jobs and scheduler
//!   job states back into task statuses
//! - [`scheduler`]: the batch-scheduler client seam (Slurm plus a test stub)
//! - [`store`]: machine persistence (Postgres plus an in-memory store)
//! - [`tasks`]: the closed set of pipeline task kinds and their command lines

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod state_machine;
pub mod store;
pub mod task_manager;
pub mod tasks;

pub use config::SeqflowConfig;
pub use engine::{
    FiniteStateMachineEngine, FiniteStateMachineFactory, MachineResumer, OrchestrationDriver,
};
pub use error::{Result, SeqflowError};
pub use state_machine::{FiniteStateMachine, State, Status, Task, Transition};
