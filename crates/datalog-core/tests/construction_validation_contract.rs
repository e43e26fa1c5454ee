//! Contract Test: Construction Validation
//!
//! Constraints verified:
//! - Duplicate source or output names are rejected
//! - Rename entries must reference registered sources, outputs and variables
//! - Ambiguous output-facing names are rejected
//! - All of the above fail at construction, never at the first round
//!
//! If this test fails, someone has moved validation into the round path
//! or made it lenient.

mod common;

use common::*;
use datalog_core::config::{DataLoggerConfig, OutputConfig, OutputKind, SourceConfig, SourceKind};
use datalog_core::{DataLogger, Error, PluginRegistry, RenameTable};

fn source(vars: &[&str]) -> Box<CountingSource> {
    Box::new(CountingSource::new(vars, record(&[])))
}

fn assert_config_error(result: datalog_core::Result<DataLogger>, hint: &str) {
    match result {
        Err(Error::Config(message)) => assert!(
            message.contains(hint),
            "expected '{}' in '{}'",
            hint,
            message
        ),
        Err(other) => panic!("expected configuration error, got {other:?}"),
        Ok(logger) => panic!("expected configuration error, got {logger:?}"),
    }
}

#[test]
fn duplicate_source_name_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a"]))
        .source("s", source(&["b"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .build();

    assert_config_error(result, "Duplicate source name");
}

#[test]
fn duplicate_output_name_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .output("o", Box::new(RecordingOutput::new(false)))
        .build();

    assert_config_error(result, "Duplicate output name");
}

#[test]
fn rename_to_unregistered_source_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .rename_table(RenameTable::builder().rename("ghost", "o", "a", "x").build())
        .build();

    assert_config_error(result, "unknown source 'ghost'");
}

#[test]
fn rename_to_unregistered_output_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .rename_table(RenameTable::builder().rename("s", "ghost", "a", "x").build())
        .build();

    assert_config_error(result, "unknown output 'ghost'");
}

#[test]
fn rename_of_unadvertised_variable_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .rename_table(RenameTable::builder().rename("s", "o", "nope", "x").build())
        .build();

    assert_config_error(result, "no such variable");
}

#[test]
fn ambiguous_output_name_rejected() {
    let result = DataLogger::builder()
        .source("s", source(&["a", "b"]))
        .output("o", Box::new(RecordingOutput::new(true)))
        .rename_table(
            RenameTable::builder()
                .rename("s", "o", "a", "x")
                .rename("s", "o", "b", "x")
                .build(),
        )
        .build();

    assert_config_error(result, "Ambiguous variable name 'x'");
}

#[test]
fn no_source_is_read_during_construction() {
    let counting = CountingSource::new(&["a"], record(&[]));
    let _logger = DataLogger::builder()
        .source("s", Box::new(counting.clone()))
        .output("o", Box::new(RecordingOutput::new(true)))
        .build()
        .unwrap();

    assert_eq!(counting.read_count(), 0);
}

#[test]
fn from_config_builds_through_registry() {
    let registry = PluginRegistry::with_builtin();
    let config = DataLoggerConfig {
        sources: vec![SourceConfig {
            name: "plc".to_string(),
            kind: SourceKind::Memory {
                variables: vec!["voltage".to_string()],
            },
        }],
        outputs: vec![OutputConfig {
            name: "mirror".to_string(),
            kind: OutputKind::Memory {
                variables: vec!["U".to_string()],
            },
        }],
        rename: RenameTable::builder().rename("plc", "mirror", "voltage", "U").build(),
        ..DataLoggerConfig::default()
    };

    let logger = DataLogger::from_config(&config, &registry).unwrap();
    assert_eq!(logger.source_names(), vec!["plc"]);
    assert_eq!(logger.columns("mirror").unwrap(), ["U"]);
}

#[test]
fn from_config_rejects_unknown_type() {
    let registry = PluginRegistry::new();
    let config = DataLoggerConfig {
        sources: vec![SourceConfig {
            name: "plc".to_string(),
            kind: SourceKind::Memory {
                variables: vec!["voltage".to_string()],
            },
        }],
        outputs: vec![OutputConfig {
            name: "mirror".to_string(),
            kind: OutputKind::Memory {
                variables: vec!["voltage".to_string()],
            },
        }],
        ..DataLoggerConfig::default()
    };

    assert_config_error(DataLogger::from_config(&config, &registry), "Unknown source type");
}
