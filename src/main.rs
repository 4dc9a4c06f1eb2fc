use clap::{Parser, ValueEnum};
use diskmark::config::SweepConfig;
use diskmark::console::{render_summary_table, run_with_progress};
use diskmark::error::user_friendly_message;
use diskmark::io::counters::{list_devices, DiskCounterSampler};
use diskmark::models::{AccessPattern, Operation};
use diskmark::util::units::parse_size;
use diskmark::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "diskmark", version, about = "Storage throughput and IOPS sweep")]
struct Cli {
    /// Config file (default: the per-user diskmark.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the workload files are created in
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Comma-separated file sizes; bare numbers are KiB (e.g. 64,1MiB,100MiB)
    #[arg(long, value_delimiter = ',', value_parser = parse_size)]
    sizes: Option<Vec<u64>>,

    /// Block size; bare numbers are KiB
    #[arg(short, long, value_parser = parse_size)]
    block_size: Option<u64>,

    /// Trials per configuration
    #[arg(short, long)]
    trials: Option<usize>,

    /// Duration budget of each timed loop (e.g. 5s, 1m)
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Access pattern(s) to sweep
    #[arg(short, long, value_enum)]
    pattern: Vec<PatternArg>,

    /// Timed operation(s) per trial, in order
    #[arg(short, long, value_enum)]
    operation: Vec<OperationArg>,

    /// Block device whose counters bracket each trial.
    /// Counters are read from /proc/diskstats; on macOS and Windows there
    /// is no counter source, so every device lookup fails.
    #[arg(long, env = "DISKMARK_DEVICE")]
    device: Option<String>,

    /// Counter table in /proc/diskstats format
    #[arg(long)]
    diskstats: Option<PathBuf>,

    /// Per-trial CSV log
    #[arg(long)]
    trials_log: Option<PathBuf>,

    /// Summary CSV log
    #[arg(long)]
    summary_log: Option<PathBuf>,

    /// Keep workload files after each trial
    #[arg(long)]
    keep_temp_files: bool,

    /// Print summaries as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to the config file and continue
    #[arg(long)]
    save_config: bool,

    /// Print the devices in the host counter table and exit
    #[arg(long)]
    list_devices: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PatternArg {
    Sequential,
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OperationArg {
    Write,
    Read,
}

impl From<PatternArg> for AccessPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Sequential => AccessPattern::Sequential,
            PatternArg::Random => AccessPattern::Random,
        }
    }
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Write => Operation::Write,
            OperationArg::Read => Operation::Read,
        }
    }
}

impl Cli {
    /// Layer CLI overrides on top of the file configuration
    fn apply(&self, mut config: SweepConfig) -> SweepConfig {
        if let Some(dir) = &self.dir {
            config.target_dir = dir.clone();
        }
        if let Some(sizes) = &self.sizes {
            config.file_sizes = sizes.clone();
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(trials) = self.trials {
            config.trial_count = trials;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if !self.pattern.is_empty() {
            config.patterns = self.pattern.iter().map(|&p| p.into()).collect();
        }
        if !self.operation.is_empty() {
            config.operations = self.operation.iter().map(|&o| o.into()).collect();
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(path) = &self.diskstats {
            config.diskstats_path = path.clone();
        }
        if let Some(path) = &self.trials_log {
            config.trials_log = path.clone();
        }
        if let Some(path) = &self.summary_log {
            config.summary_log = path.clone();
        }
        if self.keep_temp_files {
            config.keep_temp_files = true;
        }
        config
    }
}

fn load_config(cli: &Cli) -> Result<SweepConfig> {
    let base = match &cli.config {
        Some(path) => SweepConfig::load_from(path)?,
        None => SweepConfig::load()?,
    };
    let config = cli.apply(base);
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.list_devices {
        for device in list_devices(&config.counter_source())? {
            println!("{}", device);
        }
        return Ok(());
    }

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => {
                config.save_to(path)?;
                path.clone()
            }
            None => config.save()?,
        };
        info!("Saved configuration to {}", path.display());
    }

    // Fail fast before any workload file is written
    let sampler = DiskCounterSampler::connect(config.device.clone(), config.counter_source())?;

    info!(
        "Sweeping {} file sizes x {} patterns, {} trials each, {:?} per loop, device {}",
        config.file_sizes.len(),
        config.patterns.len(),
        config.trial_count,
        config.duration,
        config.device
    );

    let summaries = run_with_progress(config.clone(), sampler, !cli.json).await?;

    if cli.json {
        let rounded: Vec<_> = summaries.iter().map(|s| s.rounded()).collect();
        println!("{}", serde_json::to_string_pretty(&rounded)?);
    } else {
        print!("{}", render_summary_table(&summaries));
        println!(
            "\nTrial rows: {}\nSummary rows: {}",
            config.trials_log.display(),
            config.summary_log.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", user_friendly_message(&e));
            ExitCode::FAILURE
        }
    }
}
