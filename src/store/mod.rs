//! # State-Machine Store
//!
//! Durable storage boundary for [`FiniteStateMachine`] aggregates. The driver
//! selects machines to advance by status; the resume wrapper persists the
//! whole aggregate on a successful tick.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::state_machine::{FiniteStateMachine, Status};

pub use memory::InMemoryStateMachineStore;
pub use postgres::PgStateMachineStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait StateMachineStore: Send + Sync {
    async fn find_by_status(&self, status: Status)
        -> Result<Vec<FiniteStateMachine>, StoreError>;

    async fn find_by_statuses(
        &self,
        statuses: &[Status],
    ) -> Result<Vec<FiniteStateMachine>, StoreError>;

    async fn find_by_identifier(
        &self,
        name: &str,
    ) -> Result<Option<FiniteStateMachine>, StoreError>;

    /// Insert or replace the aggregate.
    async fn persist(&self, machine: &FiniteStateMachine) -> Result<(), StoreError>;
}
