//! End-to-end move test runs against the simulated Tic.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use csv::ReaderBuilder;
use hardware::tic::mock::SimulatedTic;
use hardware::tic::{SettleTimes, Tic, TicError};
use serde::Deserialize;
use test_bench::move_test::{
    CycleOutcome, MoveTest, MoveTestConfig, MoveTestError, StatusMode, CSV_HEADER,
};

#[derive(Debug, Deserialize)]
struct Row {
    position: i32,
    speed: i32,
    encoder_position: i32,
    analog_reading: u32,
    analog_parsed: f64,
    vin: f64,
    time: f64,
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Row>) {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = reader.deserialize().map(|r| r.unwrap()).collect();
    (header, rows)
}

fn bench(step: i32, config: MoveTestConfig) -> (MoveTest<SimulatedTic>, SimulatedTic) {
    let sim = SimulatedTic::new(step);
    let tic = Tic::new(sim.clone()).with_settle_times(SettleTimes::none());
    (MoveTest::new(tic, config), sim)
}

#[test]
fn test_default_run_writes_four_files() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        output_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let (mut test, sim) = bench(37, config);

    let report = test.run().unwrap();

    assert!(report.directory.starts_with(root.path()));
    let name = report.directory.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("test_"));
    assert_eq!(name.len(), "test_YYYYMMDD_HHMMSS".len());

    let targets: Vec<i32> = report.cycles.iter().map(|c| c.target).collect();
    assert_eq!(targets, vec![200, 400, 600, 800]);

    for cycle in &report.cycles {
        assert_eq!(cycle.outcome, CycleOutcome::Completed);
        assert_eq!(
            cycle.path,
            report.directory.join(format!("target_{}.csv", cycle.target))
        );
        let (header, rows) = read_rows(&cycle.path);
        assert_eq!(header, CSV_HEADER);
        assert_eq!(rows.len(), cycle.rows);
        assert_eq!(rows.last().unwrap().position, 0);
    }

    // Run ends with the stop sequence
    let lines = sim.command_lines();
    assert_eq!(
        lines[lines.len() - 3..],
        ["--position 0", "--deenergize", "--enter-safe-start"]
    );
    assert!(!sim.is_energized());
}

#[test]
fn test_target_reached_before_return() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1],
        ..Default::default()
    };
    let (mut test, _sim) = bench(30, config);

    let report = test.run_in(root.path().to_path_buf()).unwrap();
    let (_, rows) = read_rows(&report.cycles[0].path);

    // The first row at the target closes the outbound phase; every row after
    // it belongs to the return.
    let reached = rows.iter().position(|r| r.position == 200).unwrap();
    assert!(rows[..reached].iter().all(|r| r.position < 200));
    assert!(rows[reached + 1..].iter().all(|r| r.position < 200));
    assert_eq!(rows.last().unwrap().position, 0);
    assert_eq!(rows[0].position, 0);
}

#[test]
fn test_sample_fields() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![2],
        ..Default::default()
    };
    let (mut test, sim) = bench(50, config);
    sim.set_analog([10, 480, 20, 30]);
    sim.set_vin(11.8);

    let report = test.run_in(root.path().to_path_buf()).unwrap();
    let (_, rows) = read_rows(&report.cycles[0].path);

    for row in &rows {
        assert_eq!(row.analog_reading, 480);
        assert_relative_eq!(row.analog_parsed, row.analog_reading as f64 / 160.0);
        assert_relative_eq!(row.vin, 11.8);
    }
    assert!(rows.windows(2).all(|w| w[0].time <= w[1].time));
    assert!(rows.iter().any(|r| r.speed > 0));
    assert!(rows.iter().any(|r| r.speed < 0));
    assert!(rows.iter().any(|r| r.encoder_position > 0));
}

#[test]
fn test_snapshot_mode_run() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1, 2],
        status_mode: StatusMode::Snapshot,
        ..Default::default()
    };
    let (mut test, sim) = bench(100, config);

    let report = test.run_in(root.path().to_path_buf()).unwrap();
    let total_rows: usize = report.cycles.iter().map(|c| c.rows).sum();
    assert_eq!(sim.status_queries(), total_rows);

    // One report per row, so positions move by whole steps
    let (_, rows) = read_rows(&report.cycles[1].path);
    let positions: Vec<i32> = rows.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0, 100, 200, 300, 400, 300, 200, 100, 0]);
}

#[test]
fn test_interrupt_stops_device_and_continues() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1, 2],
        status_mode: StatusMode::Snapshot,
        ..Default::default()
    };
    let (test, sim) = bench(10, config);
    let interrupt = Arc::new(AtomicBool::new(false));
    let mut test = test.with_interrupt(Arc::clone(&interrupt));
    sim.interrupt_after(4, Arc::clone(&interrupt));

    test.tic_mut().start();
    sim.clear_commands();
    let first = test.run_cycle(root.path(), 1).unwrap();

    assert_eq!(first.outcome, CycleOutcome::Interrupted);
    assert_eq!(first.rows, 5);
    assert_eq!(
        sim.command_lines(),
        vec![
            "--position 200",
            "--position 0",
            "--position 0",
            "--deenergize",
            "--enter-safe-start",
        ]
    );
    assert!(!interrupt.load(Ordering::SeqCst));

    // Only complete rows in the closed file
    let contents = std::fs::read_to_string(&first.path).unwrap();
    assert!(contents.ends_with('\n'));
    for line in contents.lines() {
        assert_eq!(line.split(',').count(), CSV_HEADER.len());
    }
    let (_, rows) = read_rows(&first.path);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.last().unwrap().position, 40);
}

#[test]
fn test_interrupted_run_reaches_next_cycle() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1, 1],
        status_mode: StatusMode::Snapshot,
        ..Default::default()
    };
    let (test, sim) = bench(10, config);
    let interrupt = Arc::new(AtomicBool::new(false));
    let mut test = test.with_interrupt(Arc::clone(&interrupt));
    // Every status query from the third on raises the flag again, so the
    // second cycle is cancelled right after its first row.
    sim.interrupt_after(2, Arc::clone(&interrupt));

    let report = test.run_in(root.path().to_path_buf()).unwrap();

    assert_eq!(report.cycles.len(), 2);
    assert!(report
        .cycles
        .iter()
        .all(|c| c.outcome == CycleOutcome::Interrupted));
    assert_eq!(report.cycles[0].rows, 3);
    assert_eq!(report.cycles[1].rows, 1);
    assert!(!sim.is_energized());
}

#[test]
fn test_status_query_killed_by_interrupt() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1, 2],
        status_mode: StatusMode::Snapshot,
        ..Default::default()
    };
    let (test, sim) = bench(10, config);
    let interrupt = Arc::new(AtomicBool::new(false));
    let mut test = test.with_interrupt(Arc::clone(&interrupt));
    // The fifth status query dies with the Ctrl-C that raised the flag
    sim.kill_on_interrupt_after(4, Arc::clone(&interrupt));

    let report = test.run_in(root.path().to_path_buf()).unwrap();

    let first = &report.cycles[0];
    assert_eq!(first.outcome, CycleOutcome::Interrupted);
    assert_eq!(first.rows, 4);
    let (_, rows) = read_rows(&first.path);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.last().unwrap().position, 30);

    let lines = sim.command_lines();
    assert_eq!(
        lines[3..11],
        [
            "--position 200",
            "--position 0",
            "--position 0",
            "--deenergize",
            "--enter-safe-start",
            "--exit-safe-start",
            "--energize",
            "--position 0",
        ]
    );

    // The device is started again and the next cycle runs to completion
    assert!(!report.interrupted);
    assert_eq!(report.cycles[1].outcome, CycleOutcome::Completed);
    let (_, rows) = read_rows(&report.cycles[1].path);
    assert!(rows.iter().any(|r| r.position == 400));
    assert_eq!(rows.last().unwrap().position, 0);
    assert!(!interrupt.load(Ordering::SeqCst));
    assert!(!sim.is_energized());
}

#[test]
fn test_status_failure_ends_run() {
    let root = tempfile::tempdir().unwrap();
    let config = MoveTestConfig {
        turns: vec![1, 2, 3, 4],
        status_mode: StatusMode::Snapshot,
        ..Default::default()
    };
    let (mut test, sim) = bench(10, config);
    sim.corrupt_after(6);

    let err = test.run_in(root.path().to_path_buf()).unwrap_err();
    assert!(matches!(
        err,
        MoveTestError::Tic(TicError::LabelNotFound(_))
    ));

    // Rows written before the failure survive
    let (_, rows) = read_rows(&root.path().join("target_200.csv"));
    assert_eq!(rows.len(), 6);
    assert!(!root.path().join("target_400.csv").exists());
}
