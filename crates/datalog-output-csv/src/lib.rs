// # CSV Data Output
//
// This crate writes logged rounds to a delimited text file.
//
// ## File Layout
//
// ```text
// Time;temperature;pressure
// 2026-01-09 12:00:00.000;21.5;1013
// 2026-01-09 12:00:01.000;;1012
// ```
//
// - The header is the column layout bound by the DataLogger
// - One row per round, columns in header order
// - Missing values and absent variables both render as an empty field
//
// ## File Handling
//
// The file is created (parent directories included) and truncated on the
// first write, not at construction. A logger that never runs leaves no
// file behind.

use datalog_core::config::OutputKind;
use datalog_core::registry::PluginRegistry;
use datalog_core::traits::{DataOutput, DataOutputFactory};
use datalog_core::{Error, Record, Result};

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Default field delimiter
pub const DEFAULT_DELIMITER: char = ';';

/// Delimited text file output
pub struct CsvDataOutput {
    /// File to write
    path: PathBuf,

    /// Field delimiter (ASCII)
    delimiter: u8,

    log_time_required: bool,

    /// Column layout, bound once by the DataLogger
    columns: Option<Vec<String>>,

    /// Open file, `None` until the header is written
    file: Mutex<Option<File>>,
}

impl CsvDataOutput {
    /// Create a new CSV output
    ///
    /// # Parameters
    ///
    /// - `path`: File to write (created on first write)
    /// - `delimiter`: Field delimiter, must be ASCII
    /// - `log_time_required`: Whether the first column is the log time
    ///
    /// # Errors
    ///
    /// `Error::Config` if the path is empty or the delimiter is not usable
    pub fn new(
        path: impl Into<PathBuf>,
        delimiter: char,
        log_time_required: bool,
    ) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::config("CSV output path cannot be empty"));
        }
        if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' {
            return Err(Error::config(format!(
                "Invalid CSV delimiter: {:?}",
                delimiter
            )));
        }

        Ok(Self {
            path,
            delimiter: delimiter as u8,
            log_time_required,
            columns: None,
            file: Mutex::new(None),
        })
    }

    /// Create a CSV output with the default delimiter and a log-time column
    pub fn with_defaults(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(path, DEFAULT_DELIMITER, true)
    }

    /// File written by this output
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bound column layout, if any
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Encode one row with the configured delimiter and quoting rules
    fn encode_row<I, S>(&self, fields: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer
            .write_record(fields)
            .map_err(|e| Error::Other(format!("CSV encoding failed: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| Error::Other(format!("CSV encoding failed: {}", e.error())))
    }

    /// Create the file (and its parent directories) and write the header
    async fn create_file(&self, columns: &[String]) -> Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&self.path).await?;
        file.write_all(&self.encode_row(columns)?).await?;

        tracing::info!(
            "Created CSV file {} with {} column(s)",
            self.path.display(),
            columns.len()
        );
        Ok(file)
    }
}

#[async_trait::async_trait]
impl DataOutput for CsvDataOutput {
    async fn log_data(&self, record: &Record) -> Result<()> {
        let columns = self.columns.as_deref().ok_or_else(|| {
            Error::sink_write(
                self.path.display().to_string(),
                "no column layout bound before the first write",
            )
        })?;

        let row = self.encode_row(columns.iter().map(|column| {
            record
                .get(column)
                .filter(|value| !value.is_missing())
                .map(ToString::to_string)
                .unwrap_or_default()
        }))?;

        let mut file = self.file.lock().await;
        if file.is_none() {
            *file = Some(self.create_file(columns).await?);
        }
        if let Some(file) = file.as_mut() {
            file.write_all(&row).await?;
            file.flush().await?;
        }

        tracing::trace!("Wrote {} byte(s) to {}", row.len(), self.path.display());
        Ok(())
    }

    fn log_time_required(&self) -> bool {
        self.log_time_required
    }

    fn bind_columns(&mut self, columns: &[String]) -> Result<()> {
        if self.columns.is_some() {
            return Err(Error::invalid_input(format!(
                "Columns of {} are already bound",
                self.path.display()
            )));
        }
        self.columns = Some(columns.to_vec());
        Ok(())
    }
}

/// Factory for creating CSV outputs
pub struct CsvOutputFactory;

impl DataOutputFactory for CsvOutputFactory {
    fn create(&self, config: &OutputKind) -> Result<Box<dyn DataOutput>> {
        match config {
            OutputKind::Csv {
                path,
                delimiter,
                log_time_required,
            } => Ok(Box::new(CsvDataOutput::new(
                path,
                *delimiter,
                *log_time_required,
            )?)),
            _ => Err(Error::config("Invalid config for CSV output")),
        }
    }
}

/// Register the CSV output with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_output("csv", Box::new(CsvOutputFactory));
}
