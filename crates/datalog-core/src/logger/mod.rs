//! Data logger orchestration
//!
//! The DataLogger is responsible for:
//! - Owning the named source and output registries
//! - Resolving the per (source, output) variable names once
//! - Reading every source into one polling round
//! - Renaming, merging and delivering a round to every output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐                      ┌─────────────┐
//! │ DataSource  │──┐                ┌─▶│ DataOutput  │
//! └─────────────┘  │  PollingRound  │  └─────────────┘
//! ┌─────────────┐  ├──────────────▶ ├─▶┌─────────────┐
//! │ DataSource  │──┘   (rename,     │  │ DataOutput  │
//! └─────────────┘       merge,      │  └─────────────┘
//!                       log time)   └─▶ ...
//! ```
//!
//! ## Round Flow
//!
//! 1. Read every source, in registry order (all-or-nothing)
//! 2. For each output, rename each source record via the resolved table
//! 3. Merge into one record, log time first if the output requires it
//! 4. Deliver to the output
//!
//! The logger defines no schedule. Scheduling strategies implement
//! [`DataLogging`] on top of it.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{DataLoggerConfig, check_unique_names};
use crate::error::{Error, Result};
use crate::registry::PluginRegistry;
use crate::rename::{RenameTable, VariableNameTable};
use crate::timestamp::LOG_TIME_KEY;
use crate::traits::{DataOutput, DataSource};
use crate::value::Record;

/// Result of reading every source once: source name -> record
///
/// Entries keep the source registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollingRound {
    records: Vec<(String, Record)>,
}

impl PollingRound {
    /// Create an empty round
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the record of one source
    ///
    /// A second record for the same source replaces the first.
    pub fn insert(&mut self, source_name: impl Into<String>, record: Record) {
        let source_name = source_name.into();
        match self.records.iter_mut().find(|(name, _)| *name == source_name) {
            Some((_, existing)) => *existing = record,
            None => self.records.push((source_name, record)),
        }
    }

    /// Record of a source
    pub fn get(&self, source_name: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|(name, _)| name == source_name)
            .map(|(_, record)| record)
    }

    /// Iterate over (source name, record) in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Number of sources in this round
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the round holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A registered output with its fixed column layout
struct OutputEntry {
    name: String,
    output: Box<dyn DataOutput>,
    columns: Vec<String>,
}

/// Core data logger
///
/// Owns the source and output registries and the resolved variable-name
/// table. All three are fixed at construction.
///
/// ## Lifecycle
///
/// 1. Create with [`DataLogger::builder()`] or [`DataLogger::from_config()`]
/// 2. Drive rounds with a scheduling strategy (e.g. [`TimeTriggeredLogger`](crate::TimeTriggeredLogger))
///    or manually via [`read_data_all_sources`](Self::read_data_all_sources) and
///    [`log_data_all_outputs`](Self::log_data_all_outputs)
pub struct DataLogger {
    /// Sources in polling order
    sources: Vec<(String, Box<dyn DataSource>)>,

    /// Outputs in delivery order
    outputs: Vec<OutputEntry>,

    /// Resolved names per (source, output)
    names: VariableNameTable,
}

impl std::fmt::Debug for DataLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLogger")
            .field("sources", &self.source_names())
            .field("outputs", &self.output_names())
            .finish()
    }
}

impl DataLogger {
    /// Start building a logger
    pub fn builder() -> DataLoggerBuilder {
        DataLoggerBuilder::default()
    }

    /// Create a logger from configuration, instantiating every source and
    /// output through the registry
    pub fn from_config(config: &DataLoggerConfig, registry: &PluginRegistry) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder().rename_table(config.rename.clone());
        if let Some(delimiter) = &config.source_prefix_delimiter {
            builder = builder.source_prefix_delimiter(delimiter.clone());
        }
        for source in &config.sources {
            builder = builder.source(source.name.clone(), registry.create_source(source)?);
        }
        for output in &config.outputs {
            builder = builder.output(output.name.clone(), registry.create_output(output)?);
        }
        builder.build()
    }

    fn new(
        sources: Vec<(String, Box<dyn DataSource>)>,
        outputs: Vec<(String, Box<dyn DataOutput>)>,
        rename: RenameTable,
        prefix_delimiter: Option<String>,
    ) -> Result<Self> {
        check_unique_names("source", sources.iter().map(|(name, _)| name.as_str()))?;
        check_unique_names("output", outputs.iter().map(|(name, _)| name.as_str()))?;

        let source_variables: Vec<(&str, &[String])> = sources
            .iter()
            .map(|(name, source)| (name.as_str(), source.all_variable_names()))
            .collect();
        let output_names: Vec<&str> = outputs.iter().map(|(name, _)| name.as_str()).collect();

        let names = VariableNameTable::resolve(
            &source_variables,
            &output_names,
            &rename,
            prefix_delimiter.as_deref(),
        )?;

        let mut entries = Vec::with_capacity(outputs.len());
        for (name, mut output) in outputs {
            let columns = output_columns(&names, &sources, &name, output.log_time_required());
            output
                .bind_columns(&columns)
                .map_err(|e| Error::config(format!("Output '{}': {}", name, e)))?;
            debug!("Output {} columns: {:?}", name, columns);
            entries.push(OutputEntry {
                name,
                output,
                columns,
            });
        }

        info!(
            "Data logger initialized with {} source(s) and {} output(s)",
            sources.len(),
            entries.len()
        );

        Ok(Self {
            sources,
            outputs: entries,
            names,
        })
    }

    /// Read data from every source
    ///
    /// Sources are read sequentially in registry order. The first failure
    /// aborts the round: no partial round is ever returned.
    ///
    /// # Errors
    ///
    /// - `Error::SourceRead` if a source fails or reports a variable it
    ///   never advertised
    pub async fn read_data_all_sources(&self) -> Result<PollingRound> {
        let mut round = PollingRound {
            records: Vec::with_capacity(self.sources.len()),
        };

        for (name, source) in &self.sources {
            let record = source.read_data().await.map_err(|e| e.for_source(name))?;

            let advertised = source.all_variable_names();
            if let Some(unknown) = record.keys().find(|key| !advertised.contains(*key)) {
                return Err(Error::source_read(
                    name.as_str(),
                    format!("reported unadvertised variable '{}'", unknown),
                ));
            }

            debug!("Read {} value(s) from {}", record.len(), name);
            round.records.push((name.clone(), record));
        }

        Ok(round)
    }

    /// Log one round to every output
    ///
    /// Every output receives the same `timestamp`. For each output the
    /// source records are renamed and merged into one record; when two
    /// sources share an output-facing name, the earlier source wins. The
    /// log-time field, if required, is inserted first and is never
    /// overwritten by source data.
    ///
    /// Outputs are written sequentially. If one fails, the error is returned
    /// immediately and earlier outputs keep what they already received.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if the round names an unknown source or variable
    /// - `Error::SinkWrite` if an output fails
    pub async fn log_data_all_outputs(&self, round: &PollingRound, timestamp: &str) -> Result<()> {
        for entry in &self.outputs {
            let record = self.merge_for_output(round, entry, timestamp)?;
            debug!("Logging {} value(s) to {}", record.len(), entry.name);
            entry
                .output
                .log_data(&record)
                .await
                .map_err(|e| e.for_output(&entry.name))?;
        }
        Ok(())
    }

    fn merge_for_output(
        &self,
        round: &PollingRound,
        entry: &OutputEntry,
        timestamp: &str,
    ) -> Result<Record> {
        let mut merged = Record::with_capacity(entry.columns.len());
        if entry.output.log_time_required() {
            merged.insert(LOG_TIME_KEY.to_string(), timestamp.into());
        }

        for (source_name, record) in round.iter() {
            let resolved = self.names.get(source_name, &entry.name).ok_or_else(|| {
                Error::invalid_input(format!("Round contains unknown source '{}'", source_name))
            })?;

            for (variable, value) in record {
                let target = resolved.output_name(variable).ok_or_else(|| {
                    Error::invalid_input(format!(
                        "Source '{}' has no variable '{}'",
                        source_name, variable
                    ))
                })?;
                merged
                    .entry(target.to_string())
                    .or_insert_with(|| value.clone());
            }
        }

        Ok(merged)
    }

    /// Source names in registry order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Output names in registry order
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Fixed column layout of an output
    pub fn columns(&self, output_name: &str) -> Option<&[String]> {
        self.outputs
            .iter()
            .find(|entry| entry.name == output_name)
            .map(|entry| entry.columns.as_slice())
    }

    /// Resolved variable names
    pub fn variable_names(&self) -> &VariableNameTable {
        &self.names
    }
}

/// Column layout of one output: log time first (if required), then every
/// source's resolved names in registry order, first occurrence wins.
fn output_columns(
    names: &VariableNameTable,
    sources: &[(String, Box<dyn DataSource>)],
    output_name: &str,
    log_time_required: bool,
) -> Vec<String> {
    let mut columns = Vec::new();
    let mut seen = HashSet::new();

    if log_time_required {
        seen.insert(LOG_TIME_KEY.to_string());
        columns.push(LOG_TIME_KEY.to_string());
    }

    for (source_name, _) in sources {
        let Some(resolved) = names.get(source_name, output_name) else {
            continue;
        };
        for name in resolved.output_names() {
            if seen.insert(name.to_string()) {
                columns.push(name.to_string());
            } else if log_time_required && name == LOG_TIME_KEY {
                warn!(
                    "Variable '{}' of source {} is shadowed by the log time in output {}",
                    name, source_name, output_name
                );
            }
        }
    }

    columns
}

/// Builder for [`DataLogger`]
#[derive(Default)]
pub struct DataLoggerBuilder {
    sources: Vec<(String, Box<dyn DataSource>)>,
    outputs: Vec<(String, Box<dyn DataOutput>)>,
    rename: RenameTable,
    prefix_delimiter: Option<String>,
}

impl DataLoggerBuilder {
    /// Register a named source (polled in registration order)
    pub fn source(mut self, name: impl Into<String>, source: Box<dyn DataSource>) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    /// Register a named output (written in registration order)
    pub fn output(mut self, name: impl Into<String>, output: Box<dyn DataOutput>) -> Self {
        self.outputs.push((name.into(), output));
        self
    }

    /// Set the rename table
    pub fn rename_table(mut self, rename: RenameTable) -> Self {
        self.rename = rename;
        self
    }

    /// Prefix every output-facing name with `<source name><delimiter>`
    pub fn source_prefix_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.prefix_delimiter = Some(delimiter.into());
        self
    }

    /// Validate and build the logger
    ///
    /// # Errors
    ///
    /// `Error::Config` on duplicate names, rename references to unknown
    /// sources, outputs or variables, or ambiguous output-facing names.
    pub fn build(self) -> Result<DataLogger> {
        DataLogger::new(self.sources, self.outputs, self.rename, self.prefix_delimiter)
    }
}

/// A scheduling strategy driving a [`DataLogger`]
#[async_trait]
pub trait DataLogging: Send + Sync {
    /// Summary returned when logging ends
    type Summary: Send;

    /// The logger being driven
    fn data_logger(&self) -> &DataLogger;

    /// Run data logging until the strategy's end condition
    async fn run_data_logging(&self) -> Result<Self::Summary>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::{Arc, Mutex};

    struct FixedSource {
        variables: Vec<String>,
        record: Record,
    }

    impl FixedSource {
        fn boxed(variables: &[&str], values: &[(&str, Value)]) -> Box<dyn DataSource> {
            Box::new(Self {
                variables: variables.iter().map(|s| s.to_string()).collect(),
                record: values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl DataSource for FixedSource {
        async fn read_data(&self) -> Result<Record> {
            Ok(self.record.clone())
        }

        fn all_variable_names(&self) -> &[String] {
            &self.variables
        }
    }

    #[derive(Clone, Default)]
    struct CapturingOutput {
        log_time: bool,
        received: Arc<Mutex<Vec<Record>>>,
        columns: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DataOutput for CapturingOutput {
        async fn log_data(&self, record: &Record) -> Result<()> {
            self.received.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn log_time_required(&self) -> bool {
            self.log_time
        }

        fn bind_columns(&mut self, columns: &[String]) -> Result<()> {
            *self.columns.lock().unwrap() = columns.to_vec();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_earlier_source_wins_shared_name() {
        let output = CapturingOutput::default();
        let logger = DataLogger::builder()
            .source("first", FixedSource::boxed(&["v"], &[("v", Value::from(1))]))
            .source("second", FixedSource::boxed(&["v", "w"], &[("v", Value::from(2)), ("w", Value::from(3))]))
            .output("out", Box::new(output.clone()))
            .build()
            .unwrap();

        let round = logger.read_data_all_sources().await.unwrap();
        logger.log_data_all_outputs(&round, "ts").await.unwrap();

        let received = output.received.lock().unwrap();
        assert_eq!(received[0].get("v"), Some(&Value::Int(1)));
        assert_eq!(received[0].get("w"), Some(&Value::Int(3)));
        assert_eq!(*output.columns.lock().unwrap(), vec!["v", "w"]);
    }

    #[tokio::test]
    async fn test_log_time_not_overwritten_by_source() {
        let output = CapturingOutput {
            log_time: true,
            ..Default::default()
        };
        let logger = DataLogger::builder()
            .source("src", FixedSource::boxed(&[LOG_TIME_KEY, "a"], &[(LOG_TIME_KEY, Value::from("fake"))]))
            .output("out", Box::new(output.clone()))
            .build()
            .unwrap();

        let round = logger.read_data_all_sources().await.unwrap();
        logger.log_data_all_outputs(&round, "real").await.unwrap();

        let received = output.received.lock().unwrap();
        assert_eq!(received[0].get(LOG_TIME_KEY), Some(&Value::from("real")));
        assert_eq!(logger.columns("out").unwrap(), [LOG_TIME_KEY, "a"]);
    }

    #[tokio::test]
    async fn test_prefix_delimiter_separates_sources() {
        let output = CapturingOutput::default();
        let logger = DataLogger::builder()
            .source("Sou1", FixedSource::boxed(&["v"], &[("v", Value::from(1))]))
            .source("Sou2", FixedSource::boxed(&["v"], &[("v", Value::from(2))]))
            .output("out", Box::new(output.clone()))
            .source_prefix_delimiter("_")
            .build()
            .unwrap();

        let round = logger.read_data_all_sources().await.unwrap();
        logger.log_data_all_outputs(&round, "ts").await.unwrap();

        let received = output.received.lock().unwrap();
        assert_eq!(received[0].get("Sou1_v"), Some(&Value::Int(1)));
        assert_eq!(received[0].get("Sou2_v"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn test_unadvertised_variable_fails_round() {
        let logger = DataLogger::builder()
            .source("src", FixedSource::boxed(&["a"], &[("b", Value::from(1))]))
            .output("out", Box::new(CapturingOutput::default()))
            .build()
            .unwrap();

        let err = logger.read_data_all_sources().await.unwrap_err();
        assert!(matches!(err, Error::SourceRead { ref source_name, .. } if source_name == "src"));
    }

    #[tokio::test]
    async fn test_round_with_unknown_source_rejected() {
        let logger = DataLogger::builder()
            .source("src", FixedSource::boxed(&["a"], &[]))
            .output("out", Box::new(CapturingOutput::default()))
            .build()
            .unwrap();

        let mut round = PollingRound::new();
        round.insert("ghost", Record::new());

        let err = logger.log_data_all_outputs(&round, "ts").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_polling_round_keeps_order() {
        let mut round = PollingRound::new();
        round.insert("b", Record::new());
        round.insert("a", Record::new());
        round.insert("b", Record::from([("x".to_string(), Value::from(1))]));

        assert_eq!(round.len(), 2);
        assert_eq!(round.iter().map(|(name, _)| name).collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(round.get("b").unwrap().len(), 1);
    }
}
