mod common;

use common::{diskstats_fixture, init_test_logging};
use diskmark::bench::{DriveLoop, TrialRunner};
use diskmark::config::SweepConfig;
use diskmark::io::counters::{CounterSource, DiskCounterSampler};
use diskmark::io::write_file;
use diskmark::models::{AccessPattern, Operation, WorkloadSpec};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::Duration;
use tempfile::tempdir;
use tracing::info;

#[test]
fn test_sequential_write_scenario() {
    init_test_logging();
    info!(test = "test_sequential_write_scenario", phase = "setup");

    let dir = tempdir().unwrap();
    let trials_log = dir.path().join("hddstats.csv");
    let config = SweepConfig::new()
        .with_target_dir(dir.path().to_path_buf())
        .with_file_sizes(vec![1024 * 1024])
        .with_block_size(64 * 1024)
        .with_patterns(vec![AccessPattern::Sequential])
        .with_operations(vec![Operation::Write])
        .with_trial_count(1)
        .with_duration(Duration::from_secs(2))
        .with_keep_temp_files(true)
        .with_logs(trials_log.clone(), dir.path().join("summary.csv"));

    let sampler =
        DiskCounterSampler::connect("sda", CounterSource::Diskstats(diskstats_fixture(dir.path())))
            .unwrap();
    let mut runner = TrialRunner::with_rng(&config, sampler, SmallRng::seed_from_u64(2024));

    let template = config.workloads().unwrap()[0];
    let result = runner.run_trial(&template, config.duration).unwrap();

    let write = result.write.expect("write sample");
    assert!(write.rounds >= 1);
    assert!(write.elapsed >= Duration::from_secs(2));
    assert!(result.read.is_none());

    let kept: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("tempfile_"))
        .collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].metadata().unwrap().len(), 1024 * 1024);

    let log = std::fs::read_to_string(&trials_log).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Date, Time, Filesize(KiB)"));
    assert_eq!(lines[1].split(',').nth(2), Some("1024"));

    info!(test = "test_sequential_write_scenario", phase = "complete", rounds = write.rounds);
}

#[test]
fn test_random_read_scenario_covers_each_offset() {
    init_test_logging();

    let dir = tempdir().unwrap();
    let path = dir.path().join("random.dat");
    write_file(&path, 1024 * 1024, 128 * 1024, false).unwrap();

    let workload = WorkloadSpec::new(
        1024 * 1024,
        128 * 1024,
        AccessPattern::Random,
        Operation::Read,
    )
    .unwrap();
    assert_eq!(workload.block_count(), 8);

    let mut drive = DriveLoop::with_rng(SmallRng::seed_from_u64(8));
    let mut orders = HashSet::new();
    for _ in 0..10 {
        let order = workload.pass_order(drive.rng_mut());
        let offsets: Vec<u64> = order.iter().map(|b| b.offset).collect();
        let distinct: HashSet<u64> = offsets.iter().copied().collect();
        assert_eq!(offsets.len(), 8);
        assert_eq!(distinct.len(), 8);
        assert!(offsets.iter().all(|o| o % (128 * 1024) == 0 && *o < 1024 * 1024));
        orders.insert(offsets);
    }
    assert!(orders.len() > 1);

    let sample = drive
        .drive(&workload, &path, Duration::from_millis(200))
        .unwrap();
    assert!(sample.rounds >= 1);
    assert!(sample.elapsed >= Duration::from_millis(200));
    assert_eq!(
        sample.iops,
        sample.throughput_mibps * 1024.0 / workload.block_size_kib()
    );
}

#[test]
fn test_full_sweep_writes_both_logs() {
    init_test_logging();

    let dir = tempdir().unwrap();
    let config = SweepConfig::new()
        .with_target_dir(dir.path().to_path_buf())
        .with_file_sizes(vec![32 * 1024, 96 * 1024])
        .with_block_size(32 * 1024)
        .with_patterns(vec![AccessPattern::Sequential, AccessPattern::Random])
        .with_trial_count(2)
        .with_duration(Duration::from_millis(10))
        .with_logs(dir.path().join("t.csv"), dir.path().join("s.csv"));

    let sampler =
        DiskCounterSampler::connect("sda", CounterSource::Diskstats(diskstats_fixture(dir.path())))
            .unwrap();
    let summaries = TrialRunner::new(&config, sampler).run_sweep(&config).unwrap();
    assert_eq!(summaries.len(), 4);

    let trials = std::fs::read_to_string(dir.path().join("t.csv")).unwrap();
    assert_eq!(trials.lines().count(), 1 + 4 * 2);

    let summary = std::fs::read_to_string(dir.path().join("s.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().skip(1).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("32,sequential,"));
    assert!(rows[3].starts_with("96,random,"));

    // Device counters never move in the fixture
    for row in trials.lines().skip(1) {
        assert!(row.ends_with(",0.00,0.00,0.00,0.00,0.00"));
    }
}
