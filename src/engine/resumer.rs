//! Resume wrapper: single-flight guard plus transactional boundary around
//! one engine tick.
//!
//! The guard is process-wide, not per-machine — a deliberate simplification
//! carried over from the source system: all orchestration ticks serialize
//! against each other, so a slow advance for one machine delays the tick for
//! every other machine. It is injected at construction so tests can build
//! independent guards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::{EngineError, FiniteStateMachineEngine};
use crate::scheduler::SchedulerContext;
use crate::state_machine::FiniteStateMachine;
use crate::store::{StateMachineStore, StoreError};

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The tick ran and the updated aggregate was persisted.
    Advanced,
    /// Another resume was in flight; this call was a no-op.
    Skipped,
}

/// Releases the single-flight flag on every exit path, including panics and
/// transaction failures — a stuck guard would block all future ticks.
struct FlightPermit {
    flag: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct MachineResumer {
    engine: Arc<FiniteStateMachineEngine>,
    store: Arc<dyn StateMachineStore>,
    in_flight: Arc<AtomicBool>,
}

impl MachineResumer {
    pub fn new(
        engine: Arc<FiniteStateMachineEngine>,
        store: Arc<dyn StateMachineStore>,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            store,
            in_flight,
        }
    }

    /// Run one guarded, transactional tick for the given machine.
    ///
    /// The aggregate is reloaded from the store and advanced on that fresh
    /// copy, so mutations persisted after the driver built its working set
    /// (operator retry promotions, review sign-offs) are not overwritten.
    /// Persisting the advanced copy on success is the commit, and dropping
    /// it on any failure is the rollback — the caller's view of the machine
    /// is untouched either way.
    pub async fn resume(
        &self,
        machine: &FiniteStateMachine,
        ctx: &SchedulerContext,
    ) -> Result<ResumeOutcome, ResumeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(machine = %machine.name, "resume already in flight; skipping");
            return Ok(ResumeOutcome::Skipped);
        }
        let _permit = FlightPermit {
            flag: self.in_flight.clone(),
        };

        match self.run_tick(machine, ctx).await {
            Ok(()) => Ok(ResumeOutcome::Advanced),
            Err(e) => {
                error!(machine = %machine.name, error = %e, "tick failed; changes rolled back");
                Err(e)
            }
        }
    }

    async fn run_tick(
        &self,
        machine: &FiniteStateMachine,
        ctx: &SchedulerContext,
    ) -> Result<(), ResumeError> {
        let mut working = match self.store.find_by_identifier(&machine.name).await? {
            Some(fresh) => fresh,
            // Not persisted yet: advance the caller's copy
            None => machine.clone(),
        };
        self.engine.advance(&mut working, ctx).await?;
        self.store.persist(&working).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{SchedulerContext, SchedulerStub};
    use crate::state_machine::State;
    use crate::task_manager::ScheduledTaskManager;

    fn resumer_with_store() -> (MachineResumer, Arc<crate::store::InMemoryStateMachineStore>) {
        let store = Arc::new(crate::store::InMemoryStateMachineStore::new());
        let engine = Arc::new(FiniteStateMachineEngine::new(Arc::new(
            ScheduledTaskManager::new(),
        )));
        let resumer = MachineResumer::new(engine, store.clone(), Arc::new(AtomicBool::new(false)));
        (resumer, store)
    }

    #[tokio::test]
    async fn test_failed_tick_persists_nothing_and_releases_guard() {
        let (resumer, store) = resumer_with_store();
        let ctx = SchedulerContext::new(Arc::new(SchedulerStub::new()));

        // No active states: advance errors, nothing is persisted
        let broken = FiniteStateMachine::new("broken");
        let result = resumer.resume(&broken, &ctx).await;
        assert!(matches!(
            result,
            Err(ResumeError::Engine(EngineError::NoActiveStates { .. }))
        ));
        assert!(store.is_empty());

        // The guard was released: a valid machine advances afterwards
        let mut ok = FiniteStateMachine::new("ok");
        ok.states.push(State::new("s1").start_state());
        let outcome = resumer.resume(&ok, &ctx).await.unwrap();
        assert_eq!(outcome, ResumeOutcome::Advanced);
        assert_eq!(store.len(), 1);
    }
}
