//! Configuration loading.
//!
//! Settings come from an optional TOML file plus `SEQFLOW_`-prefixed
//! environment variables, with environment variables winning. Everything has
//! a default so the crate runs unconfigured against a local scheduler stub.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Root configuration for the orchestration service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SeqflowConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

/// How to reach the batch scheduler's command-line front end.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_sbatch_path")]
    pub sbatch_path: PathBuf,
    #[serde(default = "default_sacct_path")]
    pub sacct_path: PathBuf,
    /// Partition passed to every submission when set.
    #[serde(default)]
    pub partition: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sbatch_path: default_sbatch_path(),
            sacct_path: default_sacct_path(),
            partition: None,
        }
    }
}

/// Filesystem layout shared by every machine the factory wires.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_demultiplex_output")]
    pub demultiplex_output: PathBuf,
    #[serde(default = "default_intermediate_results")]
    pub intermediate_results: PathBuf,
    #[serde(default = "default_reference_genome")]
    pub reference_genome: PathBuf,
    #[serde(default = "default_haplotype_database")]
    pub haplotype_database: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            demultiplex_output: default_demultiplex_output(),
            intermediate_results: default_intermediate_results(),
            reference_genome: default_reference_genome(),
            haplotype_database: default_haplotype_database(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl DriverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_sbatch_path() -> PathBuf {
    PathBuf::from("sbatch")
}

fn default_sacct_path() -> PathBuf {
    PathBuf::from("sacct")
}

fn default_demultiplex_output() -> PathBuf {
    PathBuf::from("/seq/dragen/aggregation")
}

fn default_intermediate_results() -> PathBuf {
    PathBuf::from("/local/scratch/dragen")
}

fn default_reference_genome() -> PathBuf {
    PathBuf::from("/refs/hg38/hg38.fa")
}

fn default_haplotype_database() -> PathBuf {
    PathBuf::from("/refs/hg38/haplotype_map.txt")
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl SeqflowConfig {
    /// Load from `seqflow.toml` in the working directory (if present) merged
    /// with `SEQFLOW_`-prefixed environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("seqflow.toml"))
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("SEQFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_no_file_present() {
        let cfg = SeqflowConfig::load_from(Path::new("/nonexistent/seqflow.toml")).unwrap();
        assert_eq!(cfg.scheduler.sbatch_path, PathBuf::from("sbatch"));
        assert_eq!(cfg.driver.poll_interval(), Duration::from_secs(60));
        assert!(cfg.scheduler.partition.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seqflow.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[scheduler]\npartition = \"dragen\"\n\n[driver]\npoll_interval_secs = 5"
        )
        .unwrap();

        let cfg = SeqflowConfig::load_from(&path).unwrap();
        assert_eq!(cfg.scheduler.partition.as_deref(), Some("dragen"));
        assert_eq!(cfg.driver.poll_interval(), Duration::from_secs(5));
        // untouched sections keep their defaults
        assert_eq!(cfg.paths.reference_genome, PathBuf::from("/refs/hg38/hg38.fa"));
    }
}
