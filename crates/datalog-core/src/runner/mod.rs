//! Time-triggered data logging
//!
//! The TimeTriggeredLogger repeats one round (timestamp, read all sources,
//! log all outputs) at a fixed interval, optionally bounded by a total
//! duration.
//!
//! ## State Machine
//!
//! ```text
//!  Idle ──run_data_logging()──▶ Running ──duration elapsed / stop / abort──▶ Stopped
//! ```
//!
//! ## Scheduling
//!
//! - Rounds start every `interval`, measured from the start of the previous
//!   round (the round's own run time is subtracted from the sleep)
//! - A round that overruns the interval is followed immediately by the next
//!   one; missed ticks are not replayed
//! - A round is started only if its scheduled start lies before
//!   `start + duration` and that end has not already passed; an overrun
//!   that reaches the end finishes the run instead of starting late
//! - A stop request takes effect before the next round; it never interrupts
//!   a round in progress, so no output ever misses a round the others got

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{RoundErrorPolicy, RunnerConfig};
use crate::error::{Error, Result};
use crate::logger::{DataLogger, DataLogging};
use crate::timestamp::timestamp_now;

/// Runner lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Constructed, not started
    Idle,
    /// Loop executing
    Running,
    /// Loop exited (terminal)
    Stopped,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunnerState::Idle,
            1 => RunnerState::Running,
            _ => RunnerState::Stopped,
        }
    }
}

/// Why the runner stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured duration elapsed
    DurationElapsed,
    /// A stop was requested through a [`StopHandle`]
    Cancelled,
    /// A round failed under [`RoundErrorPolicy::Abort`]
    RoundFailed,
}

/// Events emitted by the TimeTriggeredLogger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerEvent {
    /// Runner started
    Started {
        sources_count: usize,
        outputs_count: usize,
    },

    /// A round was delivered to every output
    RoundCompleted {
        /// 1-based round counter
        round: u64,
        timestamp: String,
    },

    /// A round failed
    RoundFailed {
        round: u64,
        error: String,
    },

    /// Runner stopped
    Stopped {
        reason: StopReason,
        rounds: u64,
    },
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds started (completed and failed)
    pub rounds: u64,
    /// Rounds that failed
    pub failed_rounds: u64,
    /// Why the loop ended
    pub reason: StopReason,
}

/// Cloneable handle to stop a running logger
///
/// The stop flag is the only state shared between the loop and the outside
/// world. Stopping before the run starts makes the run exit immediately.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl StopHandle {
    /// Request the runner to stop before its next round
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Time-triggered data logger
///
/// ## Lifecycle
///
/// 1. Create with [`TimeTriggeredLogger::new()`]
/// 2. Keep a [`StopHandle`] if the run must be cancellable
/// 3. Run with [`run_data_logging()`](DataLogging::run_data_logging)
/// 4. The runner is `Stopped` afterwards and cannot be restarted
pub struct TimeTriggeredLogger {
    logger: DataLogger,

    /// Time between round starts
    interval: Duration,

    /// Total run time, `None` runs until stopped
    duration: Option<Duration>,

    on_round_error: RoundErrorPolicy,

    state: AtomicU8,

    stop: StopHandle,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<LoggerEvent>,
}

impl TimeTriggeredLogger {
    /// Create a new time-triggered logger
    ///
    /// # Returns
    ///
    /// A tuple of (runner, event_receiver) where event_receiver yields runner events
    ///
    /// # Errors
    ///
    /// `Error::Config` if the interval is zero or the duration is not positive
    /// or too large to schedule
    pub fn new(
        logger: DataLogger,
        config: RunnerConfig,
    ) -> Result<(Self, mpsc::Receiver<LoggerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        info!("Initializing time-triggered data logger ...");
        let runner = Self {
            logger,
            interval: config.interval(),
            duration: config.duration(),
            on_round_error: config.on_round_error,
            state: AtomicU8::new(RunnerState::Idle as u8),
            stop: StopHandle::default(),
            event_tx: tx,
        };

        Ok((runner, rx))
    }

    /// Handle to stop this runner
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunnerState {
        RunnerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Run one round: timestamp, read all sources, log all outputs
    ///
    /// # Returns
    ///
    /// The timestamp shared by every output in this round
    pub async fn run_round(&self) -> Result<String> {
        let timestamp = timestamp_now();
        let round = self.logger.read_data_all_sources().await?;
        self.logger.log_data_all_outputs(&round, &timestamp).await?;
        Ok(timestamp)
    }

    async fn run_loop(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let end = match self.duration.map(|duration| started.checked_add(duration)) {
            Some(None) => {
                self.state
                    .store(RunnerState::Stopped as u8, Ordering::SeqCst);
                return Err(Error::config(format!(
                    "Logging duration is out of range: {:?}",
                    self.duration
                )));
            }
            end => end.flatten(),
        };

        info!(
            "Starting data logging (interval={:?}, duration={})",
            self.interval,
            self.duration
                .map(|d| format!("{:?}", d))
                .unwrap_or_else(|| "infinite".to_string())
        );
        self.emit_event(LoggerEvent::Started {
            sources_count: self.logger.source_names().len(),
            outputs_count: self.logger.output_names().len(),
        });

        let mut rounds: u64 = 0;
        let mut failed_rounds: u64 = 0;

        let reason = loop {
            if self.stop.is_stopped() {
                warn!("Data logging stopped manually");
                break StopReason::Cancelled;
            }

            let round_start = Instant::now();
            rounds += 1;

            match self.run_round().await {
                Ok(timestamp) => {
                    debug!("Round {} logged at {}", rounds, timestamp);
                    self.emit_event(LoggerEvent::RoundCompleted {
                        round: rounds,
                        timestamp,
                    });
                }
                Err(e) => {
                    error!("Round {} failed: {}", rounds, e);
                    failed_rounds += 1;
                    self.emit_event(LoggerEvent::RoundFailed {
                        round: rounds,
                        error: e.to_string(),
                    });
                    if self.on_round_error == RoundErrorPolicy::Abort {
                        self.finish(StopReason::RoundFailed, rounds);
                        return Err(e);
                    }
                }
            }

            let next_start = round_start + self.interval;
            if let Some(end) = end
                && next_start >= end
            {
                info!("Data logging completed");
                break StopReason::DurationElapsed;
            }

            let now = Instant::now();
            if let Some(end) = end
                && now >= end
            {
                info!("Data logging completed (duration elapsed during round {})", rounds);
                break StopReason::DurationElapsed;
            }
            if next_start <= now {
                warn!(
                    "Round {} overran the interval by {:?}",
                    rounds,
                    now - next_start
                );
                continue;
            }

            debug!("Sleeping {:?} until next round", next_start - now);
            tokio::select! {
                _ = tokio::time::sleep_until(next_start) => {}
                _ = self.stop.wake.notified() => {}
            }
        };

        self.finish(reason, rounds);
        Ok(RunSummary {
            rounds,
            failed_rounds,
            reason,
        })
    }

    fn finish(&self, reason: StopReason, rounds: u64) {
        self.state
            .store(RunnerState::Stopped as u8, Ordering::SeqCst);
        info!("Data logging stopped after {} round(s): {:?}", rounds, reason);
        self.emit_event(LoggerEvent::Stopped { reason, rounds });
    }

    /// Emit a runner event
    fn emit_event(&self, event: LoggerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}

#[async_trait]
impl DataLogging for TimeTriggeredLogger {
    type Summary = RunSummary;

    fn data_logger(&self) -> &DataLogger {
        &self.logger
    }

    /// Run rounds until the duration elapses, a stop is requested, or a
    /// round fails under [`RoundErrorPolicy::Abort`]
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if the runner is not `Idle`
    /// - The round error under [`RoundErrorPolicy::Abort`]
    async fn run_data_logging(&self) -> Result<RunSummary> {
        self.state
            .compare_exchange(
                RunnerState::Idle as u8,
                RunnerState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|current| {
                Error::invalid_input(format!(
                    "Runner cannot start from state {:?}",
                    RunnerState::from_u8(current)
                ))
            })?;

        self.run_loop().await
    }
}
