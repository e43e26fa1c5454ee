//! Minimal embedding example for datalog-core
//!
//! This example demonstrates using datalog-core as a library in a custom
//! application. Sources, outputs and the runner lifecycle are all owned by
//! the application; no daemon and no configuration file are involved.

use datalog_core::system::MemorySystem;
use datalog_core::{
    DataLogger, DataLogging, DataSource, Record, RenameTable, RunnerConfig, TimeTriggeredLogger,
    Value,
};
use datalog_output_csv::CsvDataOutput;
use datalog_source_random::RandomDataSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Custom source simulating a slowly heating tank
struct TankSensor {
    names: Vec<String>,
    reads: Arc<AtomicU64>,
}

impl TankSensor {
    fn new() -> Self {
        Self {
            names: vec!["temperature".to_string(), "heater_on".to_string()],
            reads: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl DataSource for TankSensor {
    async fn read_data(&self) -> datalog_core::Result<Record> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        let temperature = 20.0 + 0.5 * n as f64;

        let mut record = Record::new();
        record.insert("temperature".to_string(), Value::from(temperature));
        record.insert("heater_on".to_string(), Value::from(temperature < 21.0));
        Ok(record)
    }

    fn all_variable_names(&self) -> &[String] {
        &self.names
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded datalog-core Example ===\n");

    // Shared store: another part of the application reads the mirrored values
    let dashboard = MemorySystem::new();

    let csv_path = std::env::temp_dir().join("datalog-demo").join("tank.csv");

    println!("1. Building logger...");
    let logger = DataLogger::builder()
        .source("tank", Box::new(TankSensor::new()))
        .source(
            "noise",
            Box::new(RandomDataSource::new(2, 0.0, 0.25)?.with_seed(7)),
        )
        .output("file", Box::new(CsvDataOutput::with_defaults(&csv_path)?))
        .output(
            "dashboard",
            Box::new(dashboard.data_output(vec!["T".to_string(), "heater_on".to_string()])),
        )
        .rename_table(
            RenameTable::builder()
                .rename("tank", "dashboard", "temperature", "T")
                .build(),
        )
        .build()?;

    for output in logger.output_names() {
        println!("   {} columns: {:?}", output, logger.columns(output).unwrap_or_default());
    }

    let (runner, mut events) = TimeTriggeredLogger::new(
        logger,
        RunnerConfig::new(Duration::from_millis(200), Some(Duration::from_secs(2))),
    )?;
    let stop = runner.stop_handle();

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = events.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    // Run logger in background
    println!("3. Starting logger in background...");
    let run = tokio::spawn(async move { runner.run_data_logging().await });

    // Simulate application work
    tokio::time::sleep(Duration::from_millis(700)).await;
    println!(
        "\n4. Dashboard sees T = {:?}\n",
        dashboard.get("T").await.unwrap_or_default()
    );

    // Stop before the configured duration
    println!("5. Stopping logger...");
    stop.stop();
    let summary = run.await??;
    event_listener.await?;

    println!("\n6. Logger stopped: {:?}", summary);
    println!("\nCSV written to {}:", csv_path.display());
    print!("{}", tokio::fs::read_to_string(&csv_path).await?);

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Runner lifecycle is fully controlled by the application");
    println!("- Custom, built-in and plugin sources/outputs mix freely");
    println!("- Each output gets its own names for the same variable");

    Ok(())
}
