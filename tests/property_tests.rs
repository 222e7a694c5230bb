//! Property tests over the derived-status rules: a state's completion is a
//! pure function of its tasks, and every scheduler job state maps onto the
//! task status vocabulary in the intended bucket.

use chrono::Utc;
use proptest::prelude::*;

use seqflow::scheduler::JobState;
use seqflow::state_machine::{State, Status, Task};
use seqflow::task_manager::ScheduledTaskManager;
use seqflow::tasks::TaskKind;

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Queued),
        Just(Status::Running),
        Just(Status::Complete),
        Just(Status::Retry),
        Just(Status::Suspended),
        Just(Status::Triage),
    ]
}

fn arb_job_state() -> impl Strategy<Value = JobState> {
    prop_oneof![
        Just(JobState::Pending),
        Just(JobState::Running),
        Just(JobState::Completing),
        Just(JobState::Completed),
        Just(JobState::Failed),
        Just(JobState::Cancelled),
        Just(JobState::Timeout),
        Just(JobState::NodeFail),
        Just(JobState::Preempted),
    ]
}

fn task_with(status: Status) -> Task {
    let mut task = Task::new("t", TaskKind::DemultiplexMetrics);
    task.apply_observed(status, Utc::now());
    task
}

proptest! {
    /// Completion is exactly "all main tasks complete and any exit task
    /// complete"; no other combination of statuses completes a state.
    #[test]
    fn state_completion_follows_from_task_statuses(
        main in proptest::collection::vec(arb_status(), 0..6),
        exit in proptest::option::of(arb_status()),
    ) {
        let mut state = State::new("s");
        for status in &main {
            state.add_task(task_with(*status));
        }
        if let Some(status) = exit {
            state.add_exit_task(task_with(status));
        }

        let main_done = main.iter().all(|s| *s == Status::Complete);
        let exit_done = exit.map_or(true, |s| s == Status::Complete);
        prop_assert_eq!(state.main_tasks_complete(), main_done);
        prop_assert_eq!(state.is_complete(), main_done && exit_done);
    }

    /// Every scheduler state lands in a live, terminal or retry bucket; none
    /// may map onto `Triage`, and only `Completed` may map onto `Complete`.
    #[test]
    fn job_state_mapping_is_total_and_sound(job_state in arb_job_state()) {
        let status = ScheduledTaskManager::map_job_state(job_state);
        prop_assert_ne!(status, Status::Triage);
        prop_assert_eq!(
            status == Status::Complete,
            job_state == JobState::Completed
        );
        // A live mapping only comes from a state the job can still leave
        if status.is_live() {
            prop_assert!(matches!(
                job_state,
                JobState::Pending | JobState::Running | JobState::Completing
            ));
        }
    }

    /// `should_poll` is live-and-fired, nothing else.
    #[test]
    fn poll_eligibility(status in arb_status(), fired in any::<bool>()) {
        let mut task = Task::new("t", TaskKind::AlignmentMetrics);
        task.status = status;
        if fired {
            task.start_time = Some(Utc::now());
        }
        prop_assert_eq!(task.should_poll(), fired && status.is_live());
    }
}
