//! In-memory store for tests and dry runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{StateMachineStore, StoreError};
use crate::state_machine::{FiniteStateMachine, Status};

#[derive(Default)]
pub struct InMemoryStateMachineStore {
    machines: RwLock<HashMap<Uuid, FiniteStateMachine>>,
}

impl InMemoryStateMachineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.machines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.read().is_empty()
    }
}

#[async_trait]
impl StateMachineStore for InMemoryStateMachineStore {
    async fn find_by_status(
        &self,
        status: Status,
    ) -> Result<Vec<FiniteStateMachine>, StoreError> {
        self.find_by_statuses(&[status]).await
    }

    async fn find_by_statuses(
        &self,
        statuses: &[Status],
    ) -> Result<Vec<FiniteStateMachine>, StoreError> {
        let mut machines: Vec<FiniteStateMachine> = self
            .machines
            .read()
            .values()
            .filter(|m| statuses.contains(&m.status))
            .cloned()
            .collect();
        // Stable order so ticks process machines deterministically
        machines.sort_by(|a, b| a.date_queued.cmp(&b.date_queued).then(a.id.cmp(&b.id)));
        Ok(machines)
    }

    async fn find_by_identifier(
        &self,
        name: &str,
    ) -> Result<Option<FiniteStateMachine>, StoreError> {
        Ok(self
            .machines
            .read()
            .values()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn persist(&self, machine: &FiniteStateMachine) -> Result<(), StoreError> {
        self.machines.write().insert(machine.id, machine.clone());
        Ok(())
    }
}
