//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal sources and outputs that record how the
//! logger calls them, without doing any real I/O.

#![allow(dead_code)]

use datalog_core::error::{Error, Result};
use datalog_core::{DataOutput, DataSource, Record, StopHandle, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Build a record from (name, value) pairs
pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// A source returning a fixed record and tracking its reads
#[derive(Clone)]
pub struct CountingSource {
    variables: Vec<String>,
    record: Record,
    /// Simulated read latency
    delay: Option<Duration>,
    /// 1-based read number that fails
    fail_on_read: Option<usize>,
    reads: Arc<AtomicUsize>,
    read_times: Arc<Mutex<Vec<Instant>>>,
}

impl CountingSource {
    pub fn new(variables: &[&str], record: Record) -> Self {
        Self {
            variables: variables.iter().map(|s| s.to_string()).collect(),
            record,
            delay: None,
            fail_on_read: None,
            reads: Arc::new(AtomicUsize::new(0)),
            read_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long inside every read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the given (1-based) read
    pub fn failing_on_read(mut self, read: usize) -> Self {
        self.fail_on_read = Some(read);
        self
    }

    /// Get the number of times read_data() was called
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// When each read_data() call started
    pub fn read_times(&self) -> Vec<Instant> {
        self.read_times.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DataSource for CountingSource {
    async fn read_data(&self) -> Result<Record> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        self.read_times.lock().unwrap().push(Instant::now());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_read == Some(read) {
            return Err(Error::Other(format!("read {} failed", read)));
        }
        Ok(self.record.clone())
    }

    fn all_variable_names(&self) -> &[String] {
        &self.variables
    }
}

/// An output recording every record it receives
#[derive(Clone, Default)]
pub struct RecordingOutput {
    log_time: bool,
    fail: bool,
    received: Arc<Mutex<Vec<Record>>>,
    columns: Arc<Mutex<Option<Vec<String>>>>,
    /// Stop the runner on the given (1-based) call
    stop_on_call: Arc<Mutex<Option<(usize, StopHandle)>>>,
}

impl RecordingOutput {
    pub fn new(log_time: bool) -> Self {
        Self {
            log_time,
            ..Self::default()
        }
    }

    /// An output whose every log_data() call fails
    pub fn failing(log_time: bool) -> Self {
        Self {
            log_time,
            fail: true,
            ..Self::default()
        }
    }

    /// Request a stop from inside the given (1-based) log_data() call
    pub fn stop_on(&self, call: usize, handle: StopHandle) {
        *self.stop_on_call.lock().unwrap() = Some((call, handle));
    }

    /// Records received so far
    pub fn received(&self) -> Vec<Record> {
        self.received.lock().unwrap().clone()
    }

    /// Get the number of times log_data() was called
    pub fn log_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Columns bound by the logger
    pub fn columns(&self) -> Option<Vec<String>> {
        self.columns.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DataOutput for RecordingOutput {
    async fn log_data(&self, record: &Record) -> Result<()> {
        if self.fail {
            return Err(Error::Other("disk full".to_string()));
        }

        let call = {
            let mut received = self.received.lock().unwrap();
            received.push(record.clone());
            received.len()
        };

        if let Some((stop_call, handle)) = self.stop_on_call.lock().unwrap().as_ref() {
            if *stop_call == call {
                handle.stop();
            }
        }
        Ok(())
    }

    fn log_time_required(&self) -> bool {
        self.log_time
    }

    fn bind_columns(&mut self, columns: &[String]) -> Result<()> {
        let mut bound = self.columns.lock().unwrap();
        if bound.is_some() {
            return Err(Error::Other("columns bound twice".to_string()));
        }
        *bound = Some(columns.to_vec());
        Ok(())
    }
}
