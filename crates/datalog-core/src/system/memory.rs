// # Memory System
//
// In-process variable store that acts as both a data source and a data
// output.
//
// ## Purpose
//
// Models an external system that can be read from and written to (a PLC,
// a broker) without any hardware. One logger can write into the store and
// another (or the same) logger can read it back.
//
// ## Delegation
//
// `MemorySystem` is neither a source nor an output. It hands out a
// `MemorySource` and a `MemoryOutput`, each a plain implementation of its
// contract that delegates to the shared store. The logger cannot tell them
// apart from any other source or output.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::{DataOutput, DataOutputFactory, DataSource, DataSourceFactory};
use crate::value::{Record, Value, strip_missing};

/// Shared in-memory variable store
///
/// Cloning is cheap and every clone refers to the same store.
///
/// # Example
///
/// ```rust,no_run
/// use datalog_core::{DataSource, Value};
/// use datalog_core::system::MemorySystem;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let system = MemorySystem::new();
///     system.set("voltage", 230.0).await;
///
///     let source = system.data_source(vec!["voltage".to_string()]);
///     let record = source.read_data().await?;
///     assert_eq!(record.get("voltage"), Some(&Value::Float(230.0)));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySystem {
    store: Arc<RwLock<Record>>,
}

impl MemorySystem {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    pub async fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.store.write().await.insert(name.into(), value.into());
    }

    /// Get a variable
    pub async fn get(&self, name: &str) -> Option<Value> {
        self.store.read().await.get(name).cloned()
    }

    /// Copy of every stored variable
    pub async fn snapshot(&self) -> Record {
        self.store.read().await.clone()
    }

    /// A data source reading `variables` from this store
    pub fn data_source(&self, variables: Vec<String>) -> MemorySource {
        MemorySource {
            system: self.clone(),
            variables,
        }
    }

    /// A data output writing `variables` into this store
    pub fn data_output(&self, variables: Vec<String>) -> MemoryOutput {
        MemoryOutput {
            system: self.clone(),
            variables,
        }
    }
}

/// Data source view of a [`MemorySystem`]
#[derive(Debug, Clone)]
pub struct MemorySource {
    system: MemorySystem,
    variables: Vec<String>,
}

#[async_trait]
impl DataSource for MemorySource {
    async fn read_data(&self) -> Result<Record, Error> {
        let store = self.system.store.read().await;
        Ok(self
            .variables
            .iter()
            .filter_map(|name| store.get(name).map(|value| (name.clone(), value.clone())))
            .collect())
    }

    fn all_variable_names(&self) -> &[String] {
        &self.variables
    }
}

/// Data output view of a [`MemorySystem`]
///
/// Only the accepted variables are written; sentinel values are stripped
/// and therefore leave the stored value untouched.
#[derive(Debug, Clone)]
pub struct MemoryOutput {
    system: MemorySystem,
    variables: Vec<String>,
}

#[async_trait]
impl DataOutput for MemoryOutput {
    async fn log_data(&self, record: &Record) -> Result<(), Error> {
        let cleaned = strip_missing(record);
        if cleaned.is_empty() {
            tracing::debug!("No values left after cleaning the record, skipping");
            return Ok(());
        }

        let mut store = self.system.store.write().await;
        for name in &self.variables {
            if let Some(value) = cleaned.get(name) {
                store.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn log_time_required(&self) -> bool {
        false
    }
}

/// Factory creating memory sources and outputs on one shared store
#[derive(Debug, Clone, Default)]
pub struct MemorySystemFactory {
    system: MemorySystem,
}

impl MemorySystemFactory {
    /// Create a factory backed by `system`
    pub fn new(system: MemorySystem) -> Self {
        Self { system }
    }

    /// The shared store sources and outputs are created on
    pub fn system(&self) -> &MemorySystem {
        &self.system
    }
}

impl DataSourceFactory for MemorySystemFactory {
    fn create(&self, config: &crate::config::SourceKind) -> Result<Box<dyn DataSource>, Error> {
        match config {
            crate::config::SourceKind::Memory { variables } => {
                Ok(Box::new(self.system.data_source(variables.clone())))
            }
            other => Err(Error::config(format!(
                "Memory factory cannot create source of type '{}'",
                other.type_name()
            ))),
        }
    }
}

impl DataOutputFactory for MemorySystemFactory {
    fn create(&self, config: &crate::config::OutputKind) -> Result<Box<dyn DataOutput>, Error> {
        match config {
            crate::config::OutputKind::Memory { variables } => {
                Ok(Box::new(self.system.data_output(variables.clone())))
            }
            other => Err(Error::config(format!(
                "Memory factory cannot create output of type '{}'",
                other.type_name()
            ))),
        }
    }
}
