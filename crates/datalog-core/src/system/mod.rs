//! Composite systems exposing both a data source and a data output
//!
//! Systems never implement [`DataSource`](crate::DataSource) or
//! [`DataOutput`](crate::DataOutput) themselves; they hand out views that do.

pub mod memory;

pub use memory::{MemoryOutput, MemorySource, MemorySystem, MemorySystemFactory};
