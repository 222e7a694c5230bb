use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::Status;
use crate::tasks::TaskKind;

/// A unit of externally-executed work, owned by exactly one [`super::State`].
///
/// A task is created `Queued`, fired (submitted to the scheduler) by the
/// engine, then polled each tick until its status turns terminal. `start_time`
/// doubles as the fired marker: a task with `start_time == None` has never
/// been submitted. `end_time` is set if and only if the task completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub kind: TaskKind,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            status: Status::Queued,
            start_time: None,
            end_time: None,
        }
    }

    /// True once the task has been submitted at least once.
    pub fn is_fired(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    /// Whether the engine should ask the task manager for this task's status
    /// this tick. Unfired tasks have nothing to poll; `Retry` waits for the
    /// retry sweep; terminal statuses are settled.
    pub fn should_poll(&self) -> bool {
        self.is_fired() && matches!(self.status, Status::Queued | Status::Running)
    }

    /// Record a status observed from the task manager, stamping `end_time`
    /// on the transition into `Complete`.
    pub fn apply_observed(&mut self, status: Status, now: DateTime<Utc>) {
        self.status = status;
        if status == Status::Complete && self.end_time.is_none() {
            self.end_time = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_task() -> Task {
        Task::new("wait", TaskKind::WaitForReview { gate_name: "review".into() })
    }

    #[test]
    fn test_new_task_is_queued_and_unfired() {
        let task = wait_task();
        assert_eq!(task.status, Status::Queued);
        assert!(!task.is_fired());
        assert!(!task.should_poll());
    }

    #[test]
    fn test_poll_eligibility() {
        let mut task = wait_task();
        task.start_time = Some(Utc::now());
        task.status = Status::Running;
        assert!(task.should_poll());

        task.status = Status::Retry;
        assert!(!task.should_poll());

        task.status = Status::Suspended;
        assert!(!task.should_poll());
    }

    #[test]
    fn test_end_time_stamped_only_on_completion() {
        let mut task = wait_task();
        let now = Utc::now();
        task.apply_observed(Status::Running, now);
        assert!(task.end_time.is_none());

        task.apply_observed(Status::Complete, now);
        assert_eq!(task.end_time, Some(now));

        // A later observation never restamps it
        let later = now + chrono::Duration::seconds(30);
        task.apply_observed(Status::Complete, later);
        assert_eq!(task.end_time, Some(now));
    }
}
