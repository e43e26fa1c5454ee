// # Data Source Trait
//
// Defines the interface for anything that produces one flat record of
// named variables on demand.
//
// ## Implementations
//
// - Synthetic random values: `datalog-source-random` crate
// - In-process shared store: `datalog_core::system::MemorySource`
// - Future: serial sensor buses, PLC connections, MQTT subscriptions
//
// ## Usage
//
// ```rust,ignore
// use datalog_core::DataSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* DataSource implementation */;
//
//     println!("Variables: {:?}", source.all_variable_names());
//     let record = source.read_data().await?;
//     println!("Read: {:?}", record);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::value::Record;

/// Trait for data source implementations
///
/// This trait defines two capabilities:
/// 1. **all_variable_names()**: The ordered, fixed set of variables this source can report
/// 2. **read_data()**: One observation of those variables
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Missing Values
///
/// A source may leave a variable out of its record, or report it as
/// [`Value::Missing`](crate::Value::Missing). Both mean "no value this
/// round" and neither is an error. Errors are reserved for failures that
/// make the whole observation unusable (lost connection, protocol error).
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform device or network I/O inside `read_data()`
/// - ✅ Keep internal buffers between calls (e.g. subscription caches)
///
/// ## Forbidden Capabilities
/// - ❌ Report variables outside `all_variable_names()` (the round fails)
/// - ❌ Change `all_variable_names()` after construction
/// - ❌ Retry or sleep inside `read_data()` (scheduling is owned by the runner)
/// - ❌ Write to outputs directly
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Take one observation
    ///
    /// Each call is exactly one observation. The returned record's keys
    /// must be a subset of [`all_variable_names`](Self::all_variable_names).
    ///
    /// # Returns
    ///
    /// - `Ok(Record)`: The observed values, possibly with gaps
    /// - `Err(Error)`: If the source could not be read at all
    async fn read_data(&self) -> Result<Record, crate::Error>;

    /// All variable names this source can report, in a stable order
    fn all_variable_names(&self) -> &[String];
}

/// Helper trait for constructing data sources from configuration
pub trait DataSourceFactory: Send + Sync {
    /// Create a DataSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration of the source to create
    ///
    /// # Returns
    ///
    /// A boxed DataSource trait object
    fn create(
        &self,
        config: &crate::config::SourceKind,
    ) -> Result<Box<dyn DataSource>, crate::Error>;
}
