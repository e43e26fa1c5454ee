// # datalogd - Data Logger Daemon
//
// This is a THIN integration layer only:
// - DO NOT add reading, renaming or scheduling logic here
// - All data logging logic lives in datalog-core
// - Configuration is via environment variables only
//
// The datalogd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering source and output plugins
// 4. Running the time-triggered logger until it ends or a signal arrives
//
// ## Configuration
//
// - `DATALOG_CONFIG`: Path to the JSON logger configuration (required)
// - `DATALOG_INTERVAL_MS`: Overrides `runner.interval_ms`
// - `DATALOG_DURATION_SECS`: Overrides `runner.duration_secs` (`0` or `none` runs until stopped)
// - `DATALOG_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// cat > /etc/datalog/plant.json <<'JSON'
// {
//   "sources": [{ "name": "sim", "type": "random_numbers", "size": 3 }],
//   "outputs": [{ "name": "file", "type": "csv", "path": "/var/lib/datalog/plant.csv" }],
//   "runner": { "interval_ms": 1000 }
// }
// JSON
//
// export DATALOG_CONFIG=/etc/datalog/plant.json
// export DATALOG_DURATION_SECS=3600
//
// datalogd
// ```

use anyhow::{Context, Result};
use datalog_core::{
    DataLogger, DataLoggerConfig, DataLogging, LoggerEvent, PluginRegistry, StopHandle,
    TimeTriggeredLogger,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DatalogExitCode {
    /// Clean shutdown (duration elapsed or stopped by signal)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (aborted round, unexpected failure)
    RuntimeError = 2,
}

impl From<DatalogExitCode> for ExitCode {
    fn from(code: DatalogExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Duration override from the environment
#[derive(Debug, Clone, Copy, PartialEq)]
enum DurationOverride {
    /// Run until stopped
    Indefinite,
    /// Run for this many seconds
    Seconds(f64),
}

/// Application configuration
struct Config {
    config_path: PathBuf,
    interval_ms: Option<u64>,
    duration: Option<DurationOverride>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let config_path = env::var("DATALOG_CONFIG")
            .context("DATALOG_CONFIG is required. Set it via: export DATALOG_CONFIG=/path/to/config.json")?;

        let interval_ms = env::var("DATALOG_INTERVAL_MS")
            .ok()
            .map(|s| {
                s.trim()
                    .parse::<u64>()
                    .with_context(|| format!("DATALOG_INTERVAL_MS is not a number: '{}'", s))
            })
            .transpose()?;

        let duration = env::var("DATALOG_DURATION_SECS")
            .ok()
            .map(|s| parse_duration_override(&s))
            .transpose()?;

        Ok(Self {
            config_path: PathBuf::from(config_path),
            interval_ms,
            duration,
            log_level: env::var("DATALOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the environment settings
    ///
    /// The logger configuration itself is validated by datalog-core.
    fn validate(&self) -> Result<()> {
        if self.config_path.as_os_str().is_empty() {
            anyhow::bail!("DATALOG_CONFIG cannot be empty");
        }
        if !self.config_path.is_file() {
            anyhow::bail!(
                "DATALOG_CONFIG does not point to a file: {}",
                self.config_path.display()
            );
        }

        if self.interval_ms == Some(0) {
            anyhow::bail!("DATALOG_INTERVAL_MS must be > 0");
        }

        if let Some(DurationOverride::Seconds(secs)) = self.duration
            && !(secs.is_finite() && secs > 0.0)
        {
            anyhow::bail!(
                "DATALOG_DURATION_SECS must be a positive number, 0 or 'none'. Got: {}",
                secs
            );
        }

        parse_log_level(&self.log_level)?;
        Ok(())
    }

    /// Read the logger configuration file and apply the overrides
    fn load_logger_config(&self) -> Result<DataLoggerConfig> {
        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;
        let mut config = DataLoggerConfig::from_json(&content)
            .with_context(|| format!("Invalid configuration in {}", self.config_path.display()))?;

        if let Some(interval_ms) = self.interval_ms {
            config.runner.interval_ms = interval_ms;
        }
        match self.duration {
            Some(DurationOverride::Indefinite) => config.runner.duration_secs = None,
            Some(DurationOverride::Seconds(secs)) => config.runner.duration_secs = Some(secs),
            None => {}
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_duration_override(value: &str) -> Result<DurationOverride> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(DurationOverride::Indefinite);
    }
    let secs: f64 = value
        .parse()
        .with_context(|| format!("DATALOG_DURATION_SECS is not a number: '{}'", value))?;
    if secs == 0.0 {
        Ok(DurationOverride::Indefinite)
    } else {
        Ok(DurationOverride::Seconds(secs))
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DATALOG_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DatalogExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DatalogExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DatalogExitCode::ConfigError.into();
    }

    info!("Starting datalogd daemon");

    let logger_config = match config.load_logger_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DatalogExitCode::ConfigError.into();
        }
    };
    info!(
        "Configuration loaded: {} source(s), {} output(s)",
        logger_config.sources.len(),
        logger_config.outputs.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DatalogExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(run_daemon(logger_config));
    result.into()
}

/// Build the registry with every plugin compiled into this binary
fn build_registry() -> PluginRegistry {
    let registry = PluginRegistry::with_builtin();

    #[cfg(feature = "random")]
    {
        info!("Registering random sources");
        datalog_source_random::register(&registry);
    }

    #[cfg(feature = "csv")]
    {
        info!("Registering CSV output");
        datalog_output_csv::register(&registry);
    }

    registry
}

/// Run the daemon
async fn run_daemon(config: DataLoggerConfig) -> DatalogExitCode {
    let registry = build_registry();

    let logger = match DataLogger::from_config(&config, &registry) {
        Ok(logger) => logger,
        Err(e) => {
            error!("Failed to create data logger: {}", e);
            return DatalogExitCode::ConfigError;
        }
    };

    let (runner, mut events) = match TimeTriggeredLogger::new(logger, config.runner.clone()) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to create runner: {}", e);
            return DatalogExitCode::ConfigError;
        }
    };

    // Drain runner events so the channel never fills up
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                LoggerEvent::RoundFailed { round, error } => {
                    warn!("Round {} failed: {}", round, error)
                }
                other => debug!("Runner event: {:?}", other),
            }
        }
    });

    let signal_task = tokio::spawn(stop_on_signal(runner.stop_handle()));

    let code = match runner.run_data_logging().await {
        Ok(summary) => {
            info!(
                "Data logging finished: {} round(s), {} failed, {:?}",
                summary.rounds, summary.failed_rounds, summary.reason
            );
            DatalogExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Data logging aborted: {}", e);
            DatalogExitCode::RuntimeError
        }
    };

    signal_task.abort();
    drop(runner);
    if let Err(e) = event_task.await {
        warn!("Event task ended abnormally: {}", e);
    }

    info!("Shutting down daemon");
    code
}

/// Stop the logger on the first shutdown signal
async fn stop_on_signal(handle: StopHandle) {
    match wait_for_shutdown().await {
        Ok(signal) => {
            info!("Received shutdown signal: {}", signal);
            handle.stop();
        }
        Err(e) => error!("Signal handling unavailable: {}", e),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
