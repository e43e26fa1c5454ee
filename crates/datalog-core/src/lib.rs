// # datalog-core
//
// Core library for the pluggable time-triggered data logger.
//
// ## Architecture Overview
//
// This library provides the orchestration layer of the logger:
// - **DataSource**: Trait for anything producing a record of named variables
// - **DataOutput**: Trait for anything consuming a record of named variables
// - **RenameTable / VariableNameTable**: Per (source, output) variable renaming
// - **DataLogger**: Owns sources and outputs, reads and logs one round
// - **TimeTriggeredLogger**: Drives rounds at a fixed interval
// - **PluginRegistry**: Plugin-based registry for source and output types
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Orchestration is separate from concrete sources and outputs
// 2. **Validated Once**: Names and renames are checked at construction, never per round
// 3. **Plugin-Based**: Source and output types are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Atomic Rounds**: A round is read completely before anything is written

pub mod traits;
pub mod logger;
pub mod runner;
pub mod rename;
pub mod registry;
pub mod config;
pub mod error;
pub mod system;
pub mod timestamp;
pub mod value;

// Re-export core types for convenience
pub use traits::{DataSource, DataOutput};
pub use logger::{DataLogger, DataLoggerBuilder, DataLogging, PollingRound};
pub use runner::{LoggerEvent, RunSummary, RunnerState, StopHandle, StopReason, TimeTriggeredLogger};
pub use rename::{RenameTable, VariableNameTable};
pub use registry::PluginRegistry;
pub use config::{DataLoggerConfig, OutputConfig, OutputKind, RunnerConfig, SourceConfig, SourceKind};
pub use error::{Error, Result};
pub use timestamp::{LOG_TIME_KEY, timestamp_now};
pub use value::{Record, Value, strip_missing};
