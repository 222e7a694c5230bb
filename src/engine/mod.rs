//! # Orchestration Engine
//!
//! The stepper that advances one [`FiniteStateMachine`] by one tick. A tick
//! is level-triggered and synchronous: it fires newly-eligible tasks, polls
//! active tasks once, follows transitions out of completed states, and
//! re-fires tasks an operator flagged for retry. The long-running work itself
//! happens out of process on the batch scheduler; the engine never waits on
//! it beyond one status query per tick.
//!
//! ## Components
//!
//! - [`FiniteStateMachineEngine`]: the single-step `advance`
//! - [`MachineResumer`]: single-flight guard + transactional boundary
//! - [`OrchestrationDriver`]: the periodic loop feeding machines to resume
//! - [`FiniteStateMachineFactory`]: wires machines for concrete pipeline runs

pub mod driver;
pub mod factory;
pub mod resumer;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scheduler::SchedulerContext;
use crate::state_machine::{FiniteStateMachine, State, Status, Task};
use crate::task_manager::TaskManager;

pub use driver::{DriverError, OrchestrationDriver, TickSummary};
pub use factory::{FiniteStateMachineFactory, RunSample, SequencingRun};
pub use resumer::{MachineResumer, ResumeError, ResumeOutcome};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Structural precondition violation: a non-terminal machine with no
    /// frontier to work on. The engine refuses to guess.
    #[error("machine '{machine}' has no active states")]
    NoActiveStates { machine: String },
}

/// Customization point run exactly once per state entry. Side effects are
/// opaque to the engine; the once-per-entry guarantee comes from the entry
/// bookkeeping, not from the hook itself.
pub trait StateHandler: Send + Sync {
    fn on_enter(&self, state: &mut State);
}

/// Default hook: do nothing on entry.
pub struct NoopStateHandler;

impl StateHandler for NoopStateHandler {
    fn on_enter(&self, _state: &mut State) {}
}

/// Advances a machine by one tick. Holds no per-machine state of its own;
/// everything observable lives on the aggregate.
pub struct FiniteStateMachineEngine {
    task_manager: Arc<dyn TaskManager>,
    state_handler: Arc<dyn StateHandler>,
}

impl FiniteStateMachineEngine {
    pub fn new(task_manager: Arc<dyn TaskManager>) -> Self {
        Self {
            task_manager,
            state_handler: Arc::new(NoopStateHandler),
        }
    }

    pub fn with_state_handler(mut self, state_handler: Arc<dyn StateHandler>) -> Self {
        self.state_handler = state_handler;
        self
    }

    /// One tick: iterate the machine's active states, firing, polling and
    /// propagating completion. Task submission failures suspend that task and
    /// never abort the tick; the only error out of here is the no-active-state
    /// precondition, raised before the machine is touched.
    pub async fn advance(
        &self,
        machine: &mut FiniteStateMachine,
        ctx: &SchedulerContext,
    ) -> Result<(), EngineError> {
        let active: Vec<usize> = machine
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            return Err(EngineError::NoActiveStates {
                machine: machine.name.clone(),
            });
        }

        let started_before_tick = machine.date_started.is_some();
        for idx in active {
            // Machine start: enter active start states and fire their tasks
            if !started_before_tick && machine.states[idx].is_start_state {
                let now = Utc::now();
                if machine.date_started.is_none() {
                    machine.date_started = Some(now);
                    machine.status = Status::Running;
                    info!(machine = %machine.name, "machine started");
                }
                self.enter_state(&mut machine.states[idx], now, ctx).await;
            }

            self.poll_tasks(&mut machine.states[idx], ctx).await;
            self.handle_exit_task(&mut machine.states[idx], ctx).await;

            if machine.states[idx].is_complete() {
                self.complete_state(machine, idx, ctx).await;
            } else {
                self.retry_sweep(&mut machine.states[idx], ctx).await;
            }
        }

        // Termination: activity only propagates by following transitions, so
        // an empty frontier means every reachable state has completed.
        if !machine.has_active_states() && machine.date_completed.is_none() {
            machine.status = Status::Complete;
            machine.date_completed = Some(Utc::now());
            info!(machine = %machine.name, "machine complete");
        }

        Ok(())
    }

    /// Enter a state: mark it alive, stamp its start, run the on-enter hook
    /// and fire its main tasks. A state that has already been entered is left
    /// alone — states are never re-entered.
    async fn enter_state(&self, state: &mut State, now: DateTime<Utc>, ctx: &SchedulerContext) {
        if state.start_time.is_some() {
            return;
        }
        state.alive = true;
        state.start_time = Some(now);
        self.state_handler.on_enter(state);
        info!(state = %state.name, "state entered");
        for i in 0..state.tasks.len() {
            self.fire_task(&mut state.tasks[i], ctx).await;
        }
    }

    /// Ask the task manager for the current status of every fired,
    /// non-settled main task.
    async fn poll_tasks(&self, state: &mut State, ctx: &SchedulerContext) {
        for task in state.tasks.iter_mut().filter(|t| t.should_poll()) {
            let observed = self.task_manager.check_status(task, ctx).await;
            task.apply_observed(observed, Utc::now());
            debug!(task = %task.name, status = %observed, "task polled");
        }
    }

    /// Once the main tasks are complete, fire the exit task if it has not
    /// been fired, otherwise poll it.
    async fn handle_exit_task(&self, state: &mut State, ctx: &SchedulerContext) {
        if !state.main_tasks_complete() {
            return;
        }
        let Some(exit) = state.exit_task.as_mut() else {
            return;
        };
        if !exit.is_fired() {
            self.fire_task(exit, ctx).await;
        } else if exit.should_poll() {
            let observed = self.task_manager.check_status(exit, ctx).await;
            exit.apply_observed(observed, Utc::now());
        }
    }

    /// The state's completion criterion holds: take it off the frontier and
    /// propagate activity along its outgoing transitions.
    async fn complete_state(
        &self,
        machine: &mut FiniteStateMachine,
        idx: usize,
        ctx: &SchedulerContext,
    ) {
        let now = Utc::now();
        machine.states[idx].exit(now);
        let from_state = machine.states[idx].name.clone();
        info!(machine = %machine.name, state = %from_state, "state complete");

        let targets: Vec<String> = machine
            .transitions_from(&from_state)
            .map(|t| t.to_state.clone())
            .collect();
        for target in targets {
            match machine.states.iter().position(|s| s.name == target) {
                Some(pos) => self.enter_state(&mut machine.states[pos], now, ctx).await,
                None => warn!(
                    machine = %machine.name,
                    from = %from_state,
                    to = %target,
                    "transition targets an unknown state"
                ),
            }
        }
    }

    /// Re-fire every task flagged `Retry` by an external signal. This is the
    /// only recovery path; `Suspended` tasks stay put until an operator
    /// promotes them.
    async fn retry_sweep(&self, state: &mut State, ctx: &SchedulerContext) {
        let mut to_retry = Vec::new();
        for (i, task) in state.tasks.iter().enumerate() {
            if task.status == Status::Retry {
                to_retry.push(i);
            }
        }
        for i in to_retry {
            info!(task = %state.tasks[i].name, "re-firing task flagged for retry");
            self.fire_task(&mut state.tasks[i], ctx).await;
        }
        if let Some(exit) = state.exit_task.as_mut() {
            if exit.status == Status::Retry {
                info!(task = %exit.name, "re-firing exit task flagged for retry");
                self.fire_task(exit, ctx).await;
            }
        }
    }

    /// Submit one task. A submission failure is per-task: the task is
    /// suspended and logged, the tick moves on.
    async fn fire_task(&self, task: &mut Task, ctx: &SchedulerContext) {
        match self.task_manager.fire(task, ctx).await {
            Ok(()) => {
                task.status = Status::Running;
                task.start_time = Some(Utc::now());
                debug!(task = %task.name, "task fired");
            }
            Err(error) => {
                warn!(task = %task.name, %error, "task submission failed; suspending");
                task.status = Status::Suspended;
            }
        }
    }
}
