//! Core traits for the data logger
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DataSource`]: Produce one record of named variables per round
//! - [`DataOutput`]: Consume one record of named variables per round

pub mod data_source;
pub mod data_output;

pub use data_source::{DataSource, DataSourceFactory};
pub use data_output::{DataOutput, DataOutputFactory};
