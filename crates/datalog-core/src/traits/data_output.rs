// # Data Output Trait
//
// Defines the interface for anything that consumes one flat record per
// round (files, brokers, databases).
//
// ## Implementations
//
// - Delimited text files: `datalog-output-csv` crate
// - In-process shared store: `datalog_core::system::MemoryOutput`
//
// ## Usage
//
// ```rust,ignore
// use datalog_core::{DataOutput, LOG_TIME_KEY, Record};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let mut output = /* DataOutput implementation */;
//
//     // Done once by the DataLogger at construction
//     output.bind_columns(&[LOG_TIME_KEY.to_string(), "temperature".to_string()])?;
//
//     let mut record = Record::new();
//     record.insert(LOG_TIME_KEY.to_string(), "2026-01-09 12:00:00.000".into());
//     record.insert("temperature".to_string(), 21.5.into());
//     output.log_data(&record).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::value::Record;

/// Trait for data output implementations
///
/// # Log Time
///
/// If [`log_time_required`](Self::log_time_required) returns `true`, every
/// record passed to [`log_data`](Self::log_data) carries the
/// [`LOG_TIME_KEY`](crate::LOG_TIME_KEY) field. The `DataLogger` guarantees
/// this; outputs do not need to check for it.
///
/// # Column Layout
///
/// The `DataLogger` computes the full set of variables an output will ever
/// receive and hands it over once through [`bind_columns`](Self::bind_columns)
/// before the first round. The layout never changes afterwards, which is what
/// makes fixed-column formats (CSV headers) possible.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Persist or transmit the record as one logical unit (one row, one message)
/// - ✅ Drop [`Value::Missing`](crate::Value::Missing) entries (see [`strip_missing`](crate::strip_missing))
///
/// ## Forbidden Capabilities
/// - ❌ Retry internally (errors propagate to the runner)
/// - ❌ Skip columns for absent keys (render them blank instead)
/// - ❌ Read from sources directly
#[async_trait]
pub trait DataOutput: Send + Sync {
    /// Deliver one record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The record was delivered
    /// - `Err(Error)`: Unrecoverable delivery failure
    async fn log_data(&self, record: &Record) -> Result<(), crate::Error>;

    /// Whether records for this output must carry the log-time field
    fn log_time_required(&self) -> bool;

    /// Receive the fixed column layout for this output
    ///
    /// Called exactly once by the `DataLogger` during construction. The log
    /// time field, if required, is the first column.
    fn bind_columns(&mut self, _columns: &[String]) -> Result<(), crate::Error> {
        Ok(())
    }
}

/// Helper trait for constructing data outputs from configuration
pub trait DataOutputFactory: Send + Sync {
    /// Create a DataOutput instance from configuration
    fn create(
        &self,
        config: &crate::config::OutputKind,
    ) -> Result<Box<dyn DataOutput>, crate::Error>;
}
