//! Console progress and report rendering
//!
//! Per-trial and per-configuration events go to the indicatif bars; the
//! runner logs them at debug level so they do not tear the bar output.

use crate::bench::trial::{TrialEvent, TrialRunner};
use crate::config::SweepConfig;
use crate::io::counters::DiskCounterSampler;
use crate::models::SummaryResult;
use crate::util::units::{format_bytes, format_iops, format_throughput};
use crate::{DiskMarkError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

/// Run the sweep on a blocking thread and render progress bars from its events.
///
/// The measurement itself stays single-threaded; only the console rendering
/// happens on the async side.
pub async fn run_with_progress(
    config: SweepConfig,
    sampler: DiskCounterSampler,
    show_progress: bool,
) -> Result<Vec<SummaryResult>> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        while let Some(event) = rx.recv().await {
            match event {
                TrialEvent::ConfigurationStarted {
                    workload,
                    trial_count,
                    index,
                    total,
                } => {
                    let pb = if show_progress {
                        ProgressBar::new(trial_count as u64)
                    } else {
                        ProgressBar::hidden()
                    };
                    if let Ok(style) = ProgressStyle::with_template(
                        "{prefix} {spinner} [{bar:20}] {pos}/{len} trials {msg}",
                    ) {
                        pb.set_style(style);
                    }
                    pb.set_prefix(format!("[{}/{}]", index + 1, total));
                    pb.set_message(format!(
                        "{} {}",
                        format_bytes(workload.file_size_bytes),
                        workload.access_pattern
                    ));
                    bar = Some(pb);
                }
                TrialEvent::TrialFinished { result, .. } => {
                    if let Some(pb) = &bar {
                        pb.inc(1);
                        pb.set_message(format!(
                            "{} {} read {} write {}",
                            format_bytes(result.workload.file_size_bytes),
                            result.workload.access_pattern,
                            format_throughput(result.read_throughput()),
                            format_throughput(result.write_throughput()),
                        ));
                    }
                }
                TrialEvent::ConfigurationFinished { summary } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_with_message(format!(
                            "{} {} done",
                            format_bytes(summary.file_size_bytes),
                            summary.pattern
                        ));
                    }
                }
            }
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        let mut runner = TrialRunner::new(&config, sampler).with_progress(tx);
        runner.run_sweep(&config)
    })
    .await
    .map_err(|e| DiskMarkError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    handle.await.ok();
    result
}

/// Plain-text table of the averaged results
pub fn render_summary_table(summaries: &[SummaryResult]) -> String {
    let mut out = format!(
        "{:>12}  {:<10}  {:>14}  {:>14}  {:>12}  {:>12}  {:>12}\n",
        "Filesize", "Pattern", "Read", "Write", "Read IOPS", "Write IOPS", "Combined"
    );
    for s in summaries {
        out.push_str(&format!(
            "{:>12}  {:<10}  {:>14}  {:>14}  {:>12}  {:>12}  {:>12}\n",
            format_bytes(s.file_size_bytes),
            s.pattern.label(),
            format_throughput(s.avg_read_throughput),
            format_throughput(s.avg_write_throughput),
            format_iops(s.avg_read_iops),
            format_iops(s.avg_write_iops),
            format_iops(s.combined_iops),
        ));
    }
    out
}
