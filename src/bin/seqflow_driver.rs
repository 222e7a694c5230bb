//! Long-running orchestration driver.
//!
//! Loads configuration, connects to Postgres, and polls every machine in a
//! non-terminal status on a fixed interval until killed.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use seqflow::config::SeqflowConfig;
use seqflow::engine::{
    FiniteStateMachineEngine, MachineResumer, OrchestrationDriver,
};
use seqflow::scheduler::SlurmClient;
use seqflow::store::PgStateMachineStore;
use seqflow::task_manager::ScheduledTaskManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    seqflow::logging::init_structured_logging();

    let config = SeqflowConfig::load().context("loading configuration")?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("connecting to postgres")?;

    let store = Arc::new(PgStateMachineStore::new(pool));
    store.ensure_schema().await.context("preparing schema")?;

    let slurm = Arc::new(SlurmClient::new(&config.scheduler));
    let engine = Arc::new(FiniteStateMachineEngine::new(Arc::new(
        ScheduledTaskManager::new(),
    )));
    let resumer = MachineResumer::new(engine, store.clone(), Arc::new(AtomicBool::new(false)));
    let driver = OrchestrationDriver::new(
        store,
        resumer,
        slurm,
        config.driver.poll_interval(),
    );

    info!(
        poll_interval_secs = config.driver.poll_interval_secs,
        "seqflow driver starting"
    );
    driver.run().await;
    Ok(())
}
