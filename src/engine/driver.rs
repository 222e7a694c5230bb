//! Periodic driver: every interval, build one scheduler context, load every
//! machine in a non-terminal status and resume each in turn.
//!
//! Timer callbacks can arrive more than once for the same deadline; ticks are
//! deduplicated on a monotonically increasing timeout timestamp.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use super::resumer::{MachineResumer, ResumeOutcome};
use crate::scheduler::{SchedulerClient, SchedulerContext};
use crate::state_machine::Status;
use crate::store::{StateMachineStore, StoreError};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one driver invocation did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// False when the invocation was dropped as a duplicate timer callback.
    pub ran: bool,
    pub advanced: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct OrchestrationDriver {
    store: Arc<dyn StateMachineStore>,
    resumer: MachineResumer,
    scheduler: Arc<dyn SchedulerClient>,
    poll_interval: Duration,
    last_timeout_millis: AtomicI64,
}

impl OrchestrationDriver {
    pub fn new(
        store: Arc<dyn StateMachineStore>,
        resumer: MachineResumer,
        scheduler: Arc<dyn SchedulerClient>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            resumer,
            scheduler,
            poll_interval,
            last_timeout_millis: AtomicI64::new(i64::MIN),
        }
    }

    /// One driver invocation, keyed on the timer's timeout timestamp.
    pub async fn tick(&self, timeout_at: DateTime<Utc>) -> Result<TickSummary, DriverError> {
        let millis = timeout_at.timestamp_millis();
        let previous = self.last_timeout_millis.load(Ordering::Acquire);
        if millis <= previous
            || self
                .last_timeout_millis
                .compare_exchange(previous, millis, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            debug!(timeout_millis = millis, "duplicate timer callback skipped");
            return Ok(TickSummary::default());
        }

        // One scheduler context per invocation, reused across machines
        let ctx = SchedulerContext::new(self.scheduler.clone());
        let machines = self
            .store
            .find_by_statuses(&[Status::Queued, Status::Running])
            .await?;

        let mut summary = TickSummary {
            ran: true,
            ..TickSummary::default()
        };
        for machine in &machines {
            match self.resumer.resume(machine, &ctx).await {
                Ok(ResumeOutcome::Advanced) => summary.advanced += 1,
                Ok(ResumeOutcome::Skipped) => summary.skipped += 1,
                Err(error) => {
                    summary.failed += 1;
                    error!(machine = %machine.name, %error, "machine tick failed");
                }
            }
        }
        info!(
            machines = machines.len(),
            advanced = summary.advanced,
            failed = summary.failed,
            "driver tick finished"
        );
        Ok(summary)
    }

    /// Run forever on a fixed interval. Store failures are logged and the
    /// loop keeps going; the next interval gets a fresh chance.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(error) = self.tick(Utc::now()).await {
                error!(%error, "driver tick errored");
            }
        }
    }
}
