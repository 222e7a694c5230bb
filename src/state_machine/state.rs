use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A named node in the machine: an ordered set of main tasks plus an optional
/// exit task that runs after the main tasks finish.
///
/// `alive` is true while the state is part of the machine's frontier of
/// progress. A state that has never been entered has no timestamps; once
/// entered, `start_time` is set and it stays alive until its completion
/// criterion holds, at which point `end_time` is stamped and it is never
/// re-entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub is_start_state: bool,
    pub alive: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
    pub exit_task: Option<Task>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_start_state: false,
            alive: false,
            start_time: None,
            end_time: None,
            tasks: Vec::new(),
            exit_task: None,
        }
    }

    /// Marks this state as an entry point of the machine. Start states are
    /// constructed alive so the first tick picks them up.
    pub fn start_state(mut self) -> Self {
        self.is_start_state = true;
        self.alive = true;
        self
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn add_exit_task(&mut self, task: Task) {
        self.exit_task = Some(task);
    }

    /// All main tasks complete, independent of the exit task.
    pub fn main_tasks_complete(&self) -> bool {
        self.tasks.iter().all(Task::is_complete)
    }

    /// The completion criterion: all main tasks complete and either no exit
    /// task or a complete one.
    pub fn is_complete(&self) -> bool {
        self.main_tasks_complete()
            && self.exit_task.as_ref().map_or(true, Task::is_complete)
    }

    /// Leave the frontier: called exactly once, when the completion criterion
    /// first holds.
    pub fn exit(&mut self, now: DateTime<Utc>) {
        self.alive = false;
        if self.end_time.is_none() {
            self.end_time = Some(now);
        }
    }

    /// Main tasks plus the exit task, mutable. The retry sweep walks this.
    pub fn all_tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut().chain(self.exit_task.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Status;
    use crate::tasks::TaskKind;

    fn task(name: &str) -> Task {
        Task::new(name, TaskKind::DemultiplexMetrics)
    }

    fn complete(mut t: Task) -> Task {
        t.apply_observed(Status::Complete, Utc::now());
        t
    }

    #[test]
    fn test_completion_without_exit_task() {
        let mut state = State::new("demultiplex");
        state.add_task(task("t1"));
        state.add_task(task("t2"));
        assert!(!state.is_complete());

        state.tasks = state.tasks.drain(..).map(complete).collect();
        assert!(state.main_tasks_complete());
        assert!(state.is_complete());
    }

    #[test]
    fn test_exit_task_gates_completion() {
        let mut state = State::new("demultiplex");
        state.add_task(complete(task("t1")));
        state.add_exit_task(task("metrics"));

        assert!(state.main_tasks_complete());
        assert!(!state.is_complete());

        state.exit_task = state.exit_task.take().map(complete);
        assert!(state.is_complete());
    }

    #[test]
    fn test_empty_state_is_trivially_complete() {
        let state = State::new("gate");
        assert!(state.is_complete());
    }

    #[test]
    fn test_exit_stamps_end_time_once() {
        let mut state = State::new("s").start_state();
        let first = Utc::now();
        state.exit(first);
        assert!(!state.alive);
        assert_eq!(state.end_time, Some(first));

        state.exit(first + chrono::Duration::seconds(5));
        assert_eq!(state.end_time, Some(first));
    }
}
