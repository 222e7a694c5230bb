//! # Pipeline Task Kinds
//!
//! The closed set of concrete work units a state can own. The engine never
//! matches on these — it sees only name, status and timestamps — but the task
//! manager dispatches on the kind to decide whether a task is submitted to
//! the batch scheduler or observed in-process (wait-for-file, review gates,
//! metrics registration).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Concrete task variants for the sequencing pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Convert BCLs to FASTQs for a run directory.
    Demultiplex {
        run_dir: PathBuf,
        output_dir: PathBuf,
        sample_sheet: PathBuf,
    },
    /// Align one sample's FASTQs against a reference.
    Alignment {
        reference: PathBuf,
        fastq_list: PathBuf,
        fastq_sample_id: String,
        output_dir: PathBuf,
        intermediate_results: PathBuf,
        output_file_prefix: String,
    },
    /// Extract a fingerprint from an aggregated alignment.
    Fingerprint {
        input_file: PathBuf,
        haplotype_database: PathBuf,
        output_prefix: String,
        reference_sequence: PathBuf,
    },
    /// Register demultiplex stats for parsing once the demultiplex finishes.
    DemultiplexMetrics,
    /// Register alignment stats for parsing once alignments finish.
    AlignmentMetrics,
    /// Push extracted fingerprints to the fingerprint store.
    FingerprintUpload,
    /// Block until a sentinel file (e.g. RTAComplete.txt) appears.
    WaitForFile { path: PathBuf },
    /// Block until an operator signs off on a review gate.
    WaitForReview { gate_name: String },
}

impl TaskKind {
    /// Whether this kind is submitted to the batch scheduler. The rest are
    /// observed or handled in-process by the task manager.
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            Self::Demultiplex { .. } | Self::Alignment { .. } | Self::Fingerprint { .. }
        )
    }

    /// The command line submitted for scheduled kinds; `None` otherwise.
    pub fn command_line(&self) -> Option<String> {
        match self {
            Self::Demultiplex {
                run_dir,
                output_dir,
                sample_sheet,
            } => Some(format!(
                "dragen --bcl-conversion-only true --bcl-input-directory {} \
                 --output-directory {} --sample-sheet {}",
                run_dir.display(),
                output_dir.display(),
                sample_sheet.display()
            )),
            Self::Alignment {
                reference,
                fastq_list,
                fastq_sample_id,
                output_dir,
                intermediate_results,
                output_file_prefix,
            } => Some(format!(
                "dragen -f -r {} --fastq-list {} --fastq-list-sample-id {} \
                 --output-directory {} --intermediate-results-dir {} \
                 --output-file-prefix {} --enable-variant-caller true \
                 --enable-duplicate-marking true --enable-map-align-output true \
                 --output-format CRAM",
                reference.display(),
                fastq_list.display(),
                fastq_sample_id,
                output_dir.display(),
                intermediate_results.display(),
                output_file_prefix
            )),
            Self::Fingerprint {
                input_file,
                haplotype_database,
                output_prefix,
                reference_sequence,
            } => Some(format!(
                "gatk ExtractFingerprint --INPUT {} --HAPLOTYPE_MAP {} \
                 --OUTPUT {}.vcf --REFERENCE_SEQUENCE {}",
                input_file.display(),
                haplotype_database.display(),
                output_prefix,
                reference_sequence.display()
            )),
            _ => None,
        }
    }
}
