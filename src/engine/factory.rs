//! Wires finite state machines for concrete pipeline runs.
//!
//! A sequencing-run machine waits for the instrument's RTAComplete.txt
//! sentinel, demultiplexes the run (with a metrics exit task), then aligns
//! each sample in its own state (with a metrics exit task). Fingerprint
//! machines are single-state: extract, then upload via the exit task.

use std::path::PathBuf;

use crate::config::PathsConfig;
use crate::state_machine::{FiniteStateMachine, State, Status, Task, Transition};
use crate::tasks::TaskKind;

/// A registered sequencing run, resolved upstream of this engine.
#[derive(Debug, Clone)]
pub struct SequencingRun {
    pub run_name: String,
    pub run_dir: PathBuf,
    pub flowcell: String,
    pub samples: Vec<RunSample>,
}

#[derive(Debug, Clone)]
pub struct RunSample {
    pub sample_id: String,
    pub lane: u32,
}

pub struct FiniteStateMachineFactory {
    paths: PathsConfig,
}

impl FiniteStateMachineFactory {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    /// Build the demultiplex-then-align machine for one sequencing run.
    pub fn create_machine_for_run(&self, run: &SequencingRun) -> FiniteStateMachine {
        let mut machine = FiniteStateMachine::new(format!("Demultiplex_{}", run.run_name));

        let analysis_dir = self
            .paths
            .demultiplex_output
            .join(&run.run_name)
            .join(machine.date_queued_label());
        let fastq_dir = analysis_dir.join("fastq");
        let sample_sheet = analysis_dir.join("SampleSheet_hsa.csv");

        // Nothing runs until the instrument finishes writing the run folder
        let sentinel = run.run_dir.join("RTAComplete.txt");
        let mut run_complete = State::new("SequencingRunComplete").start_state();
        run_complete.add_task(Task::new(
            format!("Waiting for RTAComplete.txt {}", sentinel.display()),
            TaskKind::WaitForFile { path: sentinel },
        ));
        machine.states.push(run_complete);

        let demultiplex_name = machine.date_queued_label();
        let mut demultiplex = State::new(demultiplex_name.clone());
        demultiplex.add_task(Task::new(
            format!("Demux_{}", run.run_name),
            TaskKind::Demultiplex {
                run_dir: run.run_dir.clone(),
                output_dir: fastq_dir.clone(),
                sample_sheet,
            },
        ));
        demultiplex.add_exit_task(Task::new(
            format!("Demultiplex_Metrics_{}", run.run_name),
            TaskKind::DemultiplexMetrics,
        ));
        machine.states.push(demultiplex);
        machine.transitions.push(Transition::new(
            "Sequencing Complete To Demultiplexing",
            "SequencingRunComplete",
            demultiplex_name.clone(),
        ));

        for sample in &run.samples {
            let state_name = format!(
                "Align_{}_{}_{}",
                run.flowcell, sample.lane, sample.sample_id
            );
            let mut alignment = State::new(state_name.clone());
            alignment.add_task(Task::new(
                format!("Alignment_{}_{}", sample.sample_id, run.run_name),
                TaskKind::Alignment {
                    reference: self.paths.reference_genome.clone(),
                    fastq_list: fastq_dir.join(format!("{}_fastq_list.csv", sample.sample_id)),
                    fastq_sample_id: sample.sample_id.clone(),
                    output_dir: fastq_dir.join(&sample.sample_id),
                    intermediate_results: self.paths.intermediate_results.clone(),
                    output_file_prefix: sample.sample_id.clone(),
                },
            ));
            alignment.add_exit_task(Task::new(
                format!("Alignment_Metric_{}", run.run_name),
                TaskKind::AlignmentMetrics,
            ));
            machine.states.push(alignment);
            machine.transitions.push(Transition::new(
                format!("DemuxToAlign_{}", sample.sample_id),
                demultiplex_name.clone(),
                state_name,
            ));
        }

        machine.status = Status::Running;
        machine
    }

    /// Build a fingerprinting machine for one aggregated sample.
    pub fn create_fingerprint_machine(
        &self,
        sample_id: &str,
        aligned_file: PathBuf,
    ) -> FiniteStateMachine {
        let mut machine = FiniteStateMachine::new(format!("FP_{sample_id}"));
        let label = machine.date_queued_label();

        let mut fingerprint = State::new(format!("FP_State_{sample_id}")).start_state();
        fingerprint.add_task(Task::new(
            format!("FP_{sample_id}_{label}"),
            TaskKind::Fingerprint {
                input_file: aligned_file,
                haplotype_database: self.paths.haplotype_database.clone(),
                output_prefix: sample_id.to_string(),
                reference_sequence: self.paths.reference_genome.clone(),
            },
        ));
        fingerprint.add_exit_task(Task::new(
            format!("FP_Upload_{sample_id}_{label}"),
            TaskKind::FingerprintUpload,
        ));
        machine.states.push(fingerprint);

        machine.status = Status::Running;
        machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> FiniteStateMachineFactory {
        FiniteStateMachineFactory::new(PathsConfig {
            demultiplex_output: "/seq/dragen".into(),
            intermediate_results: "/scratch/dragen".into(),
            reference_genome: "/refs/hg38".into(),
            haplotype_database: "/refs/hg38/haplotype_map.txt".into(),
        })
    }

    fn run() -> SequencingRun {
        SequencingRun {
            run_name: "240110_SL-NVA_A1".into(),
            run_dir: "/seq/runs/240110_SL-NVA_A1".into(),
            flowcell: "HSAFCDMXX".into(),
            samples: vec![
                RunSample { sample_id: "SM-1".into(), lane: 1 },
                RunSample { sample_id: "SM-2".into(), lane: 2 },
            ],
        }
    }

    #[test]
    fn test_run_machine_wiring() {
        let machine = factory().create_machine_for_run(&run());

        // wait state + demultiplex + one alignment per sample
        assert_eq!(machine.states.len(), 4);
        assert_eq!(machine.transitions.len(), 3);
        assert_eq!(machine.status, Status::Running);
        assert!(machine.date_queued.is_some());

        let start = &machine.states[0];
        assert!(start.is_start_state);
        assert!(start.alive);
        assert!(matches!(start.tasks[0].kind, TaskKind::WaitForFile { .. }));

        let demultiplex = &machine.states[1];
        assert!(!demultiplex.alive);
        assert!(matches!(demultiplex.tasks[0].kind, TaskKind::Demultiplex { .. }));
        assert_eq!(
            demultiplex.exit_task.as_ref().unwrap().kind,
            TaskKind::DemultiplexMetrics
        );

        // every alignment state is reachable from the demultiplex state
        let targets: Vec<&str> = machine
            .transitions_from(&demultiplex.name)
            .map(|t| t.to_state.as_str())
            .collect();
        assert_eq!(targets.len(), 2);
        for target in targets {
            let state = machine.state(target).unwrap();
            assert!(matches!(state.tasks[0].kind, TaskKind::Alignment { .. }));
        }
    }

    #[test]
    fn test_fingerprint_machine_wiring() {
        let machine = factory()
            .create_fingerprint_machine("SM-1", "/seq/dragen/SM-1/SM-1.cram".into());
        assert_eq!(machine.states.len(), 1);
        assert!(machine.transitions.is_empty());

        let state = &machine.states[0];
        assert!(state.is_start_state && state.alive);
        assert!(matches!(state.tasks[0].kind, TaskKind::Fingerprint { .. }));
        assert_eq!(
            state.exit_task.as_ref().unwrap().kind,
            TaskKind::FingerprintUpload
        );
    }
}
