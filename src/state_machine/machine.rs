use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::State;
use super::status::Status;
use super::transition::Transition;
use crate::tasks::TaskKind;

/// The aggregate for one pipeline run: states, transitions, overall status
/// and lifecycle timestamps. This is the unit of persistence and the unit of
/// transactional mutation — one tick reads, mutates and persists exactly one
/// machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiniteStateMachine {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub date_queued: Option<DateTime<Utc>>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_completed: Option<DateTime<Utc>>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

impl FiniteStateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: Status::Queued,
            date_queued: Some(Utc::now()),
            date_started: None,
            date_completed: None,
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// States currently on the frontier of progress.
    pub fn active_states(&self) -> Vec<&State> {
        self.states.iter().filter(|s| s.alive).collect()
    }

    pub fn has_active_states(&self) -> bool {
        self.states.iter().any(|s| s.alive)
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn state_mut(&mut self, name: &str) -> Option<&mut State> {
        self.states.iter_mut().find(|s| s.name == name)
    }

    /// Transitions leaving the named state.
    pub fn transitions_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.from_state == name)
    }

    /// Administrative entry point: flag a suspended task for resubmission.
    ///
    /// Nothing in the engine or driver calls this — promotion out of
    /// `Suspended` is an operator decision arriving between ticks. Returns
    /// false when the task does not exist or is not suspended.
    pub fn mark_for_retry(&mut self, task_id: Uuid) -> bool {
        for state in &mut self.states {
            for task in state.all_tasks_mut() {
                if task.id == task_id {
                    if task.status != Status::Suspended {
                        return false;
                    }
                    task.status = Status::Retry;
                    return true;
                }
            }
        }
        false
    }

    /// Administrative entry point: sign off a review gate, completing its
    /// task with the end stamp. Only review gates complete this way — every
    /// other kind is observed via the task manager. Returns false when the
    /// task does not exist or is not a review gate.
    pub fn sign_off_review(&mut self, task_id: Uuid) -> bool {
        for state in &mut self.states {
            for task in state.all_tasks_mut() {
                if task.id == task_id {
                    if !matches!(task.kind, TaskKind::WaitForReview { .. }) {
                        return false;
                    }
                    task.apply_observed(Status::Complete, Utc::now());
                    return true;
                }
            }
        }
        false
    }

    /// The date-queued stamp formatted for folder naming on shared storage.
    pub fn date_queued_label(&self) -> String {
        self.date_queued
            .unwrap_or_else(Utc::now)
            .format("%Y%m%d_%H%M%S")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Task;
    use crate::tasks::TaskKind;

    fn machine_with_suspended_task() -> (FiniteStateMachine, Uuid) {
        let mut machine = FiniteStateMachine::new("run_1");
        let mut state = State::new("s1").start_state();
        let mut task = Task::new("t1", TaskKind::DemultiplexMetrics);
        task.status = Status::Suspended;
        let id = task.id;
        state.add_task(task);
        machine.states.push(state);
        (machine, id)
    }

    #[test]
    fn test_active_states() {
        let mut machine = FiniteStateMachine::new("run_1");
        machine.states.push(State::new("s1").start_state());
        machine.states.push(State::new("s2"));
        let active = machine.active_states();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "s1");
    }

    #[test]
    fn test_mark_for_retry_requires_suspended() {
        let (mut machine, task_id) = machine_with_suspended_task();
        assert!(machine.mark_for_retry(task_id));
        assert_eq!(machine.states[0].tasks[0].status, Status::Retry);

        // Second call: no longer suspended, no-op
        assert!(!machine.mark_for_retry(task_id));
        assert!(!machine.mark_for_retry(Uuid::new_v4()));
    }

    #[test]
    fn test_sign_off_review_completes_gate_with_end_stamp() {
        let mut machine = FiniteStateMachine::new("run_1");
        let mut state = State::new("s1").start_state();
        let mut gate = Task::new("review_qc", TaskKind::WaitForReview { gate_name: "qc".into() });
        gate.start_time = Some(Utc::now());
        gate.status = Status::Running;
        let gate_id = gate.id;
        let other = Task::new("metrics", TaskKind::DemultiplexMetrics);
        let other_id = other.id;
        state.add_task(gate);
        state.add_task(other);
        machine.states.push(state);

        assert!(machine.sign_off_review(gate_id));
        let signed = &machine.states[0].tasks[0];
        assert_eq!(signed.status, Status::Complete);
        assert!(signed.end_time.is_some());

        // Only review gates can be signed off
        assert!(!machine.sign_off_review(other_id));
        assert!(!machine.sign_off_review(Uuid::new_v4()));
    }

    #[test]
    fn test_transitions_from() {
        let mut machine = FiniteStateMachine::new("run_1");
        machine
            .transitions
            .push(Transition::new("a_to_b", "a", "b"));
        machine
            .transitions
            .push(Transition::new("a_to_c", "a", "c"));
        machine
            .transitions
            .push(Transition::new("b_to_c", "b", "c"));

        let targets: Vec<&str> = machine
            .transitions_from("a")
            .map(|t| t.to_state.as_str())
            .collect();
        assert_eq!(targets, vec!["b", "c"]);
    }
}
