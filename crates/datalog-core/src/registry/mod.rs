//! Plugin-based source and output registry
//!
//! The registry allows data sources and data outputs to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use datalog_core::registry::PluginRegistry;
//! use datalog_core::config::SourceConfig;
//!
//! // Create a registry with the built-in memory system
//! let registry = PluginRegistry::with_builtin();
//!
//! // Register plugins
//! datalog_source_random::register(&registry);
//! datalog_output_csv::register(&registry);
//!
//! // Create a source from config
//! let source = registry.create_source(&source_config)?;
//! ```
//!
//! ## Registration
//!
//! Plugin crates should register themselves during initialization:
//!
//! ```rust,ignore
//! # use datalog_core::registry::PluginRegistry;
//! // In datalog-output-csv crate
//! pub fn register(registry: &PluginRegistry) {
//!     registry.register_output("csv", Box::new(CsvOutputFactory));
//! }
//! ```

use crate::config::{OutputConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::system::{MemorySystem, MemorySystemFactory};
use crate::traits::{DataOutput, DataOutputFactory, DataSource, DataSourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based source and output creation
///
/// The registry maintains maps of type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct PluginRegistry {
    /// Registered data source factories
    sources: RwLock<HashMap<String, Box<dyn DataSourceFactory>>>,

    /// Registered data output factories
    outputs: RwLock<HashMap<String, Box<dyn DataOutputFactory>>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `memory` type registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        register_builtin(&registry, MemorySystem::new());
        registry
    }

    /// Register a data source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "random_numbers")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn DataSourceFactory>) {
        let name = name.into();
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name, factory);
    }

    /// Register a data output factory
    ///
    /// # Parameters
    ///
    /// - `name`: Output type name (e.g., "csv")
    /// - `factory`: Factory object for creating output instances
    pub fn register_output(&self, name: impl Into<String>, factory: Box<dyn DataOutputFactory>) {
        let name = name.into();
        let mut outputs = self.outputs.write().unwrap_or_else(PoisonError::into_inner);
        outputs.insert(name, factory);
    }

    /// Create a data source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DataSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn DataSource>> {
        let source_type = config.kind.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources.get(source_type).ok_or_else(|| {
            Error::config(format!(
                "Unknown source type '{}' for source '{}'",
                source_type, config.name
            ))
        })?;

        factory.create(&config.kind)
    }

    /// Create a data output from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DataOutput>)`: Created output instance
    /// - `Err(Error)`: If the output type is not registered or creation fails
    pub fn create_output(&self, config: &OutputConfig) -> Result<Box<dyn DataOutput>> {
        let output_type = config.kind.type_name();
        let outputs = self.outputs.read().unwrap_or_else(PoisonError::into_inner);

        let factory = outputs.get(output_type).ok_or_else(|| {
            Error::config(format!(
                "Unknown output type '{}' for output '{}'",
                output_type, config.name
            ))
        })?;

        factory.create(&config.kind)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// List all registered output types
    pub fn list_outputs(&self) -> Vec<String> {
        let outputs = self.outputs.read().unwrap_or_else(PoisonError::into_inner);
        outputs.keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if an output type is registered
    pub fn has_output(&self, name: &str) -> bool {
        let outputs = self.outputs.read().unwrap_or_else(PoisonError::into_inner);
        outputs.contains_key(name)
    }
}

/// Register the `memory` source and output types on one shared store
pub fn register_builtin(registry: &PluginRegistry, system: MemorySystem) {
    let factory = MemorySystemFactory::new(system);
    registry.register_source("memory", Box::new(factory.clone()));
    registry.register_output("memory", Box::new(factory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputKind, SourceKind};

    struct MockSourceFactory;

    impl DataSourceFactory for MockSourceFactory {
        fn create(&self, _config: &SourceKind) -> Result<Box<dyn DataSource>> {
            Err(Error::Other("Mock source not implemented".to_string()))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = PluginRegistry::new();

        // Initially empty
        assert!(!registry.has_source("mock"));

        // Register
        registry.register_source("mock", Box::new(MockSourceFactory));

        // Now present
        assert!(registry.has_source("mock"));
        assert!(registry.list_sources().contains(&"mock".to_string()));
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let registry = PluginRegistry::new();
        let config = OutputConfig {
            name: "out".to_string(),
            kind: OutputKind::Csv {
                path: "out.csv".to_string(),
                delimiter: ';',
                log_time_required: true,
            },
        };

        let err = registry.create_output(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builtin_memory_types() {
        let registry = PluginRegistry::with_builtin();
        assert!(registry.has_source("memory"));
        assert!(registry.has_output("memory"));

        let config = SourceConfig {
            name: "mem".to_string(),
            kind: SourceKind::Memory {
                variables: vec!["a".to_string()],
            },
        };
        let source = registry.create_source(&config).unwrap();
        assert_eq!(source.all_variable_names(), ["a".to_string()]);
    }
}
