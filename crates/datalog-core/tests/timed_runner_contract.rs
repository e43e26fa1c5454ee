//! Contract Test: Time-Triggered Runner
//!
//! Constraints verified:
//! - Rounds start every interval, measured from the previous round's start
//! - Round run time is subtracted from the sleep (no drift)
//! - Overrunning rounds are followed immediately, missed ticks are skipped
//! - The duration bounds round starts, also when a round overruns it
//! - A stop request ends the run after the round in progress
//! - The round error policy decides between aborting and continuing
//!
//! All tests run on paused tokio time, so timings are exact.

mod common;

use common::*;
use datalog_core::config::RoundErrorPolicy;
use datalog_core::{
    DataLogger, DataLogging, Error, LoggerEvent, RunSummary, RunnerConfig, RunnerState,
    StopReason, TimeTriggeredLogger, Value,
};
use std::time::Duration;
use tokio::time::Instant;

fn logger_with(source: &CountingSource, outputs: &[&RecordingOutput]) -> DataLogger {
    let mut builder = DataLogger::builder().source("src", Box::new(source.clone()));
    for (i, output) in outputs.iter().enumerate() {
        builder = builder.output(format!("out{}", i + 1), Box::new((*output).clone()));
    }
    builder.build().unwrap()
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn offsets(start: Instant, times: &[Instant]) -> Vec<Duration> {
    times.iter().map(|t| *t - start).collect()
}

fn source() -> CountingSource {
    CountingSource::new(&["a"], record(&[("a", Value::from(1))]))
}

#[tokio::test(start_paused = true)]
async fn interval_and_duration_bound_round_count() {
    let source = source();
    let output = RecordingOutput::new(true);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(3.0))),
    )
    .unwrap();

    let start = Instant::now();
    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            rounds: 3,
            failed_rounds: 0,
            reason: StopReason::DurationElapsed,
        }
    );
    assert_eq!(
        offsets(start, &source.read_times()),
        vec![secs(0.0), secs(1.0), secs(2.0)]
    );
    assert_eq!(output.log_count(), 3);
    assert_eq!(runner.state(), RunnerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn round_time_is_subtracted_from_sleep() {
    let source = source().with_delay(Duration::from_millis(300));
    let output = RecordingOutput::new(false);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(3.0))),
    )
    .unwrap();

    let start = Instant::now();
    runner.run_data_logging().await.unwrap();

    assert_eq!(
        offsets(start, &source.read_times()),
        vec![secs(0.0), secs(1.0), secs(2.0)],
        "spacing stays one interval despite 300ms rounds"
    );
}

#[tokio::test(start_paused = true)]
async fn overrunning_round_starts_next_immediately() {
    let source = source().with_delay(Duration::from_millis(1500));
    let output = RecordingOutput::new(false);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(4.0))),
    )
    .unwrap();

    let start = Instant::now();
    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(summary.rounds, 3);
    assert_eq!(
        offsets(start, &source.read_times()),
        vec![secs(0.0), secs(1.5), secs(3.0)]
    );
}

#[tokio::test(start_paused = true)]
async fn no_round_starts_after_duration_elapsed() {
    // A single round outlasts the whole duration
    let source = source().with_delay(Duration::from_secs(5));
    let output = RecordingOutput::new(false);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(3.0))),
    )
    .unwrap();

    let start = Instant::now();
    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.reason, StopReason::DurationElapsed);
    assert_eq!(offsets(start, &source.read_times()), vec![secs(0.0)]);
    assert_eq!(output.log_count(), 1);
    assert_eq!(Instant::now() - start, secs(5.0));
}

#[tokio::test(start_paused = true)]
async fn stop_takes_effect_after_round_in_progress() {
    let source = source();
    let first = RecordingOutput::new(true);
    let second = RecordingOutput::new(true);
    let (runner, mut events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&first, &second]),
        RunnerConfig::new(secs(1.0), None),
    )
    .unwrap();

    // Requested from inside the first output of round 2
    first.stop_on(2, runner.stop_handle());

    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.reason, StopReason::Cancelled);
    assert_eq!(first.log_count(), 2);
    assert_eq!(second.log_count(), 2, "no output misses the interrupted round");

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(LoggerEvent::Stopped {
            reason: StopReason::Cancelled,
            rounds: 2
        })
    );
}

#[tokio::test(start_paused = true)]
async fn stop_from_another_task_interrupts_sleep() {
    let source = source();
    let output = RecordingOutput::new(false);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(10.0), None),
    )
    .unwrap();

    let handle = runner.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(secs(2.5)).await;
        handle.stop();
    });

    let start = Instant::now();
    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.reason, StopReason::Cancelled);
    assert_eq!(Instant::now() - start, secs(2.5), "sleep is cut short");
}

#[tokio::test(start_paused = true)]
async fn abort_policy_returns_round_error() {
    let source = source().failing_on_read(2);
    let output = RecordingOutput::new(false);
    let (runner, mut events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(5.0))),
    )
    .unwrap();

    let err = runner.run_data_logging().await.unwrap_err();

    assert!(
        matches!(err, Error::SourceRead { ref source_name, .. } if source_name == "src"),
        "unexpected error: {err:?}"
    );
    assert_eq!(output.log_count(), 1);
    assert_eq!(runner.state(), RunnerState::Stopped);

    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let LoggerEvent::RoundFailed { round, .. } = event {
            failed.push(round);
        }
    }
    assert_eq!(failed, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn continue_policy_skips_failed_round() {
    let source = source().failing_on_read(2);
    let output = RecordingOutput::new(false);
    let (runner, _events) = TimeTriggeredLogger::new(
        logger_with(&source, &[&output]),
        RunnerConfig::new(secs(1.0), Some(secs(3.0)))
            .with_round_error_policy(RoundErrorPolicy::Continue),
    )
    .unwrap();

    let summary = runner.run_data_logging().await.unwrap();

    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.failed_rounds, 1);
    assert_eq!(summary.reason, StopReason::DurationElapsed);
    assert_eq!(output.log_count(), 2);
}
