//! Slurm client shelling out to `sbatch` / `sacct`.
//!
//! Submission uses `sbatch --parsable --wrap` so the scheduler acknowledges
//! immediately with a job id; status queries use `sacct` and tolerate the
//! accounting lag right after submission by reporting `Pending`.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use super::{JobId, JobState, JobSubmission, SchedulerClient, SchedulerError};
use crate::config::SchedulerConfig;

pub struct SlurmClient {
    sbatch_path: PathBuf,
    sacct_path: PathBuf,
    partition: Option<String>,
}

impl SlurmClient {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            sbatch_path: config.sbatch_path.clone(),
            sacct_path: config.sacct_path.clone(),
            partition: config.partition.clone(),
        }
    }
}

#[async_trait]
impl SchedulerClient for SlurmClient {
    async fn submit_job(&self, submission: &JobSubmission) -> Result<JobId, SchedulerError> {
        let mut command = Command::new(&self.sbatch_path);
        command.arg("--parsable").arg("--job-name").arg(&submission.name);
        if let Some(partition) = submission.partition.as_ref().or(self.partition.as_ref()) {
            command.arg("--partition").arg(partition);
        }
        command.arg("--wrap").arg(&submission.command_line);

        let output = command.output().await?;
        if !output.status.success() {
            return Err(SchedulerError::Submission(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // --parsable prints "jobid" or "jobid;cluster"
        let stdout = String::from_utf8_lossy(&output.stdout);
        let id_token = stdout.trim().split(';').next().unwrap_or("");
        let id = id_token
            .parse::<u64>()
            .map_err(|_| SchedulerError::Parse(format!("sbatch output: {stdout}")))?;
        debug!(job_id = id, job_name = %submission.name, "sbatch accepted job");
        Ok(JobId(id))
    }

    async fn job_status(&self, job: JobId) -> Result<JobState, SchedulerError> {
        let output = Command::new(&self.sacct_path)
            .args(["-j", &job.to_string(), "--format=State", "--noheader", "--parsable2"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(SchedulerError::Query {
                job,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().find(|l| !l.trim().is_empty()) {
            // Accounting has not caught up with a fresh submission yet
            None => Ok(JobState::Pending),
            Some(line) => line
                .parse::<JobState>()
                .map_err(|_| SchedulerError::Parse(format!("sacct state for job {job}: {line}"))),
        }
    }
}
