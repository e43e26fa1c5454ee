//! Error types for the data logger
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for data logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the data logger
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid logger configuration (names, rename table, runner bounds)
    ///
    /// Raised at construction time. No partial logger is ever produced.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A data source failed to produce its record for a round
    #[error("Source '{source_name}' read failed: {message}")]
    SourceRead {
        /// Registry name of the failing source
        source_name: String,
        /// Error message
        message: String,
    },

    /// A data output failed to consume a record
    #[error("Output '{output_name}' write failed: {message}")]
    SinkWrite {
        /// Registry name of the failing output
        output_name: String,
        /// Error message
        message: String,
    },

    /// Invalid input from the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a source read error
    pub fn source_read(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(output_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            output_name: output_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Attach a source name to an error raised by that source
    ///
    /// Errors that already name a source are returned unchanged.
    pub(crate) fn for_source(self, source_name: &str) -> Self {
        match self {
            err @ Self::SourceRead { .. } => err,
            other => Self::source_read(source_name, other.to_string()),
        }
    }

    /// Attach an output name to an error raised by that output
    pub(crate) fn for_output(self, output_name: &str) -> Self {
        match self {
            err @ Self::SinkWrite { .. } => err,
            other => Self::sink_write(output_name, other.to_string()),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
