//! Variable values and records
//!
//! A [`Record`] is the flat mapping from variable name to [`Value`] that
//! sources produce and outputs consume. "No value" has two equivalent
//! representations: the key is absent, or the key is present with
//! [`Value::Missing`]. Outputs must treat both the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Flat mapping from variable name to value
pub type Record = HashMap<String, Value>;

/// A single logged value
///
/// Serialized untagged, so records read and write as plain JSON objects
/// with `null` standing for [`Value::Missing`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Key present, value unavailable this round
    #[default]
    Missing,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Whether this is the missing-value sentinel
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Remove every sentinel value from a record
///
/// Outputs call this before delivery so they never see [`Value::Missing`];
/// a stripped key then renders exactly like a key the source omitted.
pub fn strip_missing(record: &Record) -> Record {
    record
        .iter()
        .filter(|(_, value)| !value.is_missing())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
