//! Configuration types for the data logger
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::rename::RenameTable;

/// Main data logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLoggerConfig {
    /// Data sources, in polling order
    pub sources: Vec<SourceConfig>,

    /// Data outputs, in delivery order
    pub outputs: Vec<OutputConfig>,

    /// Per (source, output) variable renames
    #[serde(default)]
    pub rename: RenameTable,

    /// If set, output-facing names become `<source><delimiter><variable>`
    #[serde(default)]
    pub source_prefix_delimiter: Option<String>,

    /// Runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl DataLoggerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            outputs: Vec::new(),
            rename: RenameTable::default(),
            source_prefix_delimiter: None,
            runner: RunnerConfig::default(),
        }
    }

    /// Parse a configuration from JSON
    ///
    /// The result is not validated, so overrides can still be applied
    /// before [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the configuration
    ///
    /// Checks what can be checked without instantiating sources and
    /// outputs. Variable-level rename checks happen in
    /// [`DataLogger`](crate::DataLogger) construction.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.sources.is_empty() {
            return Err(crate::Error::config("No data sources configured"));
        }
        if self.outputs.is_empty() {
            return Err(crate::Error::config("No data outputs configured"));
        }

        check_unique_names("source", self.sources.iter().map(|s| s.name.as_str()))?;
        check_unique_names("output", self.outputs.iter().map(|o| o.name.as_str()))?;

        for source in &self.sources {
            source.kind.validate()?;
        }
        for output in &self.outputs {
            output.kind.validate()?;
        }

        let source_names: Vec<&str> = self.sources.iter().map(|s| s.name.as_str()).collect();
        let output_names: Vec<&str> = self.outputs.iter().map(|o| o.name.as_str()).collect();
        self.rename.validate_references(&source_names, &output_names)?;

        self.runner.validate()
    }
}

impl Default for DataLoggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject empty and duplicate registry names
pub(crate) fn check_unique_names<'a>(
    what: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), crate::Error> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(crate::Error::config(format!("Empty {} name", what)));
        }
        if !seen.insert(name) {
            return Err(crate::Error::config(format!(
                "Duplicate {} name: '{}'",
                what, name
            )));
        }
    }
    Ok(())
}

/// A named data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name
    pub name: String,

    /// Source type and settings
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Data source type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// Random floats in `[0, 100)`
    RandomNumbers {
        /// Number of variables
        size: usize,
        /// Probability of omitting each key
        #[serde(default)]
        key_missing_rate: f64,
        /// Probability of reporting each present key as missing
        #[serde(default)]
        value_missing_rate: f64,
    },

    /// Random ASCII strings
    RandomStrings {
        /// Number of variables
        size: usize,
        /// Length of each generated string
        #[serde(default = "default_str_length")]
        str_length: usize,
        /// Probability of omitting each key
        #[serde(default)]
        key_missing_rate: f64,
        /// Probability of reporting each present key as missing
        #[serde(default)]
        value_missing_rate: f64,
    },

    /// In-process shared variable store
    Memory {
        /// Variable names exposed by the store
        variables: Vec<String>,
    },

    /// Custom data source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceKind {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceKind::RandomNumbers {
                size,
                key_missing_rate,
                value_missing_rate,
            } => {
                check_size(*size)?;
                check_rate("key_missing_rate", *key_missing_rate)?;
                check_rate("value_missing_rate", *value_missing_rate)
            }
            SourceKind::RandomStrings {
                size,
                str_length,
                key_missing_rate,
                value_missing_rate,
            } => {
                check_size(*size)?;
                if *str_length == 0 {
                    return Err(crate::Error::config("Random string length must be > 0"));
                }
                check_rate("key_missing_rate", *key_missing_rate)?;
                check_rate("value_missing_rate", *value_missing_rate)
            }
            SourceKind::Memory { variables } => {
                if variables.is_empty() {
                    return Err(crate::Error::config(
                        "Memory source must expose at least one variable",
                    ));
                }
                Ok(())
            }
            SourceKind::Custom { factory, config } => check_custom("source", factory, config),
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceKind::RandomNumbers { .. } => "random_numbers",
            SourceKind::RandomStrings { .. } => "random_strings",
            SourceKind::Memory { .. } => "memory",
            SourceKind::Custom { factory, .. } => factory,
        }
    }
}

/// A named data output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Unique output name
    pub name: String,

    /// Output type and settings
    #[serde(flatten)]
    pub kind: OutputKind,
}

/// Data output type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputKind {
    /// Delimited text file
    Csv {
        /// File to write, parent directories are created on first write
        path: String,
        /// Field delimiter
        #[serde(default = "default_delimiter")]
        delimiter: char,
        /// Whether the first column is the log time
        #[serde(default = "default_log_time_required")]
        log_time_required: bool,
    },

    /// In-process shared variable store
    Memory {
        /// Variable names accepted by the store
        variables: Vec<String>,
    },

    /// Custom data output
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl OutputKind {
    /// Validate the output configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            OutputKind::Csv {
                path, delimiter, ..
            } => {
                if path.is_empty() {
                    return Err(crate::Error::config("CSV output path cannot be empty"));
                }
                if !delimiter.is_ascii() || *delimiter == '"' || *delimiter == '\n' {
                    return Err(crate::Error::config(format!(
                        "Invalid CSV delimiter: {:?}",
                        delimiter
                    )));
                }
                Ok(())
            }
            OutputKind::Memory { variables } => {
                if variables.is_empty() {
                    return Err(crate::Error::config(
                        "Memory output must accept at least one variable",
                    ));
                }
                Ok(())
            }
            OutputKind::Custom { factory, config } => check_custom("output", factory, config),
        }
    }

    /// Get the output type name
    pub fn type_name(&self) -> &str {
        match self {
            OutputKind::Csv { .. } => "csv",
            OutputKind::Memory { .. } => "memory",
            OutputKind::Custom { factory, .. } => factory,
        }
    }
}

/// What the runner does when a round fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundErrorPolicy {
    /// Stop the runner and return the error
    #[default]
    Abort,
    /// Log the error and continue with the next scheduled round
    Continue,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Time between round starts (in milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Total run time (in seconds), `None` runs until stopped
    #[serde(default)]
    pub duration_secs: Option<f64>,

    /// Behaviour on a failed round
    #[serde(default)]
    pub on_round_error: RoundErrorPolicy,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl RunnerConfig {
    /// Create a runner configuration with the given interval and duration
    pub fn new(interval: Duration, duration: Option<Duration>) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            duration_secs: duration.map(|d| d.as_secs_f64()),
            ..Self::default()
        }
    }

    /// Set the round error policy
    pub fn with_round_error_policy(mut self, policy: RoundErrorPolicy) -> Self {
        self.on_round_error = policy;
        self
    }

    /// Validate the runner configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_ms == 0 {
            return Err(crate::Error::config("Logging interval must be > 0"));
        }
        if let Some(duration) = self.duration_secs
            && !(duration.is_finite() && duration > 0.0)
        {
            return Err(crate::Error::config(format!(
                "Logging duration must be unset or > 0, got {}",
                duration
            )));
        }
        if let Some(duration) = self.duration_secs
            && self
                .duration()
                .and_then(|d| std::time::Instant::now().checked_add(d))
                .is_none()
        {
            return Err(crate::Error::config(format!(
                "Logging duration is out of range: {} s",
                duration
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Interval between round starts
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Total run time, if bounded
    ///
    /// Call [`validate`](Self::validate) first; invalid values yield `None`.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            duration_secs: None,
            on_round_error: RoundErrorPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn check_size(size: usize) -> Result<(), crate::Error> {
    if size == 0 {
        return Err(crate::Error::config("Random source size must be > 0"));
    }
    Ok(())
}

fn check_rate(what: &str, rate: f64) -> Result<(), crate::Error> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(crate::Error::config(format!(
            "{} must be within [0, 1], got {}",
            what, rate
        )));
    }
    Ok(())
}

fn check_custom(what: &str, factory: &str, config: &serde_json::Value) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {} factory cannot be empty",
            what
        )));
    }
    if config.is_null() {
        return Err(crate::Error::config(format!(
            "Custom {} config cannot be null",
            what
        )));
    }
    Ok(())
}

fn default_str_length() -> usize {
    5
}

fn default_delimiter() -> char {
    ';'
}

fn default_log_time_required() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_event_channel_capacity() -> usize {
    1000
}
