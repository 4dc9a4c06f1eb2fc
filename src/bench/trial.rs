//! Trial aggregation
//!
//! Runs repeated trials per (file size, pattern) configuration, brackets
//! each trial with device counter samples, logs every trial row and the
//! averaged summary row.

use crate::bench::drive::DriveLoop;
use crate::config::persistence::ResultsLog;
use crate::config::SweepConfig;
use crate::io::counters::CounterSampler;
use crate::io::generator::{write_file_with, WorkloadFile};
use crate::models::{Operation, RateSample, SummaryResult, TrialResult, WorkloadSpec};
use crate::Result;
use chrono::Local;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Progress notification emitted while a sweep runs
#[derive(Debug, Clone)]
pub enum TrialEvent {
    /// A configuration is about to run its trials
    ConfigurationStarted {
        workload: WorkloadSpec,
        trial_count: usize,
        /// Position of this configuration in the sweep (0-based)
        index: usize,
        total: usize,
    },
    /// One trial finished and was logged
    TrialFinished { trial: usize, result: TrialResult },
    /// All trials of a configuration finished and the summary was logged
    ConfigurationFinished { summary: SummaryResult },
}

/// Trial aggregator
///
/// Stateless between configurations apart from its log locations; every
/// trial gets its own freshly named workload file.
pub struct TrialRunner<S: CounterSampler, R: Rng = SmallRng> {
    target_dir: PathBuf,
    operations: Vec<Operation>,
    keep_temp_files: bool,
    sampler: S,
    log: ResultsLog,
    drive: DriveLoop<R>,
    progress: Option<UnboundedSender<TrialEvent>>,
}

impl<S: CounterSampler> TrialRunner<S, SmallRng> {
    pub fn new(config: &SweepConfig, sampler: S) -> Self {
        Self::with_rng(config, sampler, SmallRng::from_entropy())
    }
}

impl<S: CounterSampler, R: Rng> TrialRunner<S, R> {
    pub fn with_rng(config: &SweepConfig, sampler: S, rng: R) -> Self {
        Self {
            target_dir: config.target_dir.clone(),
            operations: config.operations.clone(),
            keep_temp_files: config.keep_temp_files,
            sampler,
            log: ResultsLog::new(config.trials_log.clone(), config.summary_log.clone()),
            drive: DriveLoop::with_rng(rng),
            progress: None,
        }
    }

    /// Send progress events to `tx`; a dropped receiver is ignored
    pub fn with_progress(mut self, tx: UnboundedSender<TrialEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn emit(&self, event: TrialEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    /// Run one trial of `template` and append its row to the trial log
    ///
    /// The workload file is deleted afterwards unless temp files are kept.
    pub fn run_trial(&mut self, template: &WorkloadSpec, budget: Duration) -> Result<TrialResult> {
        template.validate()?;

        let mut file = WorkloadFile::fresh(&self.target_dir, self.drive.rng_mut());
        if self.keep_temp_files {
            file.keep_on_drop();
        }

        // A trial that reads first needs content, written outside the device bracket
        if self.operations.first() == Some(&Operation::Read) {
            write_file_with(
                self.drive.rng_mut(),
                file.path(),
                template.file_size_bytes,
                template.block_size_bytes,
                template.is_sequential(),
            )?;
        }

        debug!(path = %file.path().display(), file_size = template.file_size_bytes, "trial started");

        let before = self.sampler.snapshot()?;
        let started = Instant::now();

        let mut write: Option<RateSample> = None;
        let mut read: Option<RateSample> = None;
        for &operation in &self.operations {
            let workload = template.with_operation(operation);
            let sample = self.drive.drive(&workload, file.path(), budget)?;
            match operation {
                Operation::Write => write = Some(sample),
                Operation::Read => read = Some(sample),
            }
        }

        let elapsed = started.elapsed();
        let after = self.sampler.snapshot()?;

        let result = TrialResult {
            timestamp: Local::now(),
            workload: *template,
            write,
            read,
            device: after.delta_since(&before),
            elapsed,
        };

        self.log.append_trial(&result)?;

        if !self.keep_temp_files {
            file.remove()?;
        }

        debug!(
            file_size_kib = template.file_size_kib(),
            pattern = %template.access_pattern,
            read_mibps = result.read_throughput(),
            write_mibps = result.write_throughput(),
            device_write_mibps = result.device_write_mibps(),
            device_read_mibps = result.device_read_mibps(),
            "trial finished"
        );
        Ok(result)
    }

    /// Run `trial_count` trials of one configuration and log their average
    pub fn run_configuration(
        &mut self,
        template: &WorkloadSpec,
        trial_count: usize,
        budget: Duration,
    ) -> Result<SummaryResult> {
        self.run_configuration_at(template, trial_count, budget, 0, 1)
    }

    fn run_configuration_at(
        &mut self,
        template: &WorkloadSpec,
        trial_count: usize,
        budget: Duration,
        index: usize,
        total: usize,
    ) -> Result<SummaryResult> {
        self.emit(TrialEvent::ConfigurationStarted {
            workload: *template,
            trial_count,
            index,
            total,
        });

        let mut trials = Vec::with_capacity(trial_count);
        for trial in 0..trial_count {
            let result = self.run_trial(template, budget)?;
            self.emit(TrialEvent::TrialFinished {
                trial,
                result: result.clone(),
            });
            trials.push(result);
        }

        let summary = SummaryResult::from_trials(&trials)?;
        self.log.append_summary(&summary)?;
        debug!("{}", summary.summary());

        self.emit(TrialEvent::ConfigurationFinished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Run every configuration of `config` in order
    ///
    /// The first failure aborts the whole sweep; rows already appended stay.
    pub fn run_sweep(&mut self, config: &SweepConfig) -> Result<Vec<SummaryResult>> {
        config.validate()?;
        let workloads = config.workloads()?;
        let total = workloads.len();

        info!(
            configurations = total,
            trials = config.trial_count,
            device = self.sampler.device(),
            "sweep started"
        );

        let mut summaries = Vec::with_capacity(total);
        for (index, workload) in workloads.iter().enumerate() {
            summaries.push(self.run_configuration_at(
                workload,
                config.trial_count,
                config.duration,
                index,
                total,
            )?);
        }
        Ok(summaries)
    }
}
