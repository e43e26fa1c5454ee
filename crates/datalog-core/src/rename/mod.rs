//! Variable rename table and name resolution
//!
//! The [`RenameTable`] is the user-facing configuration: for a
//! (source, output) pair, a partial mapping from the source's native
//! variable names to the names that output expects. Missing levels mean
//! identity.
//!
//! The [`VariableNameTable`] is what the logger actually uses per round. It
//! is resolved once from the sources' advertised names and the rename table,
//! validated, and never mutated afterwards.
//!
//! ## Example
//!
//! ```rust
//! use datalog_core::rename::{RenameTable, VariableNameTable};
//!
//! let table = RenameTable::builder()
//!     .rename("plc", "csv", "GVL.fVoltage", "Voltage")
//!     .build();
//!
//! let variables = vec!["GVL.fVoltage".to_string(), "GVL.fCurrent".to_string()];
//! let resolved = VariableNameTable::resolve(
//!     &[("plc", variables.as_slice())],
//!     &["csv"],
//!     &table,
//!     None,
//! )
//! .unwrap();
//!
//! let names = resolved.get("plc", "csv").unwrap();
//! assert_eq!(names.output_name("GVL.fVoltage"), Some("Voltage"));
//! assert_eq!(names.output_name("GVL.fCurrent"), Some("GVL.fCurrent"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};

/// Source variable name -> output variable name
pub type VariableRenames = BTreeMap<String, String>;

/// Rename configuration: source name -> output name -> variable renames
///
/// Serialized as the plain nested mapping:
///
/// ```json
/// { "plc": { "csv": { "GVL.fVoltage": "Voltage" } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameTable {
    entries: BTreeMap<String, BTreeMap<String, VariableRenames>>,
}

impl RenameTable {
    /// Create an empty rename table (identity for every pair)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a rename table
    pub fn builder() -> RenameTableBuilder {
        RenameTableBuilder::default()
    }

    /// Renames configured for a (source, output) pair, if any
    pub fn get(&self, source_name: &str, output_name: &str) -> Option<&VariableRenames> {
        self.entries.get(source_name)?.get(output_name)
    }

    /// Whether no renames are configured at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over every configured (source, output, renames) triple
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &VariableRenames)> {
        self.entries.iter().flat_map(|(source, outputs)| {
            outputs
                .iter()
                .map(move |(output, renames)| (source.as_str(), output.as_str(), renames))
        })
    }

    /// Check that every source and output referenced is registered
    pub fn validate_references(&self, sources: &[&str], outputs: &[&str]) -> Result<()> {
        for (source, targets) in &self.entries {
            if !sources.contains(&source.as_str()) {
                return Err(Error::config(format!(
                    "Rename table references unknown source '{}'",
                    source
                )));
            }
            for output in targets.keys() {
                if !outputs.contains(&output.as_str()) {
                    return Err(Error::config(format!(
                        "Rename table for source '{}' references unknown output '{}'",
                        source, output
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`RenameTable`]
#[derive(Debug, Default)]
pub struct RenameTableBuilder {
    table: RenameTable,
}

impl RenameTableBuilder {
    /// Rename `from` (as reported by `source`) to `to` for `output`
    ///
    /// Renaming the same variable twice for the same pair keeps the last entry.
    pub fn rename(
        mut self,
        source: impl Into<String>,
        output: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.table
            .entries
            .entry(source.into())
            .or_default()
            .entry(output.into())
            .or_default()
            .insert(from.into(), to.into());
        self
    }

    /// Finish building
    pub fn build(self) -> RenameTable {
        self.table
    }
}

/// Resolved names for one (source, output) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    /// (source variable name, output-facing name), in source order
    names: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ResolvedNames {
    /// Output-facing name of a source variable
    ///
    /// Returns `None` if the source never advertised `source_variable`.
    pub fn output_name(&self, source_variable: &str) -> Option<&str> {
        self.index
            .get(source_variable)
            .map(|&i| self.names[i].1.as_str())
    }

    /// All output-facing names, in the source's advertised order
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(_, to)| to.as_str())
    }

    /// Number of relevant variables
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the source advertises no variables
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolve the output-facing names of one source for one output
///
/// Names without a rename entry pass through unchanged. When
/// `prefix_delimiter` is set, every resulting name is additionally prefixed
/// with `<source_name><delimiter>`.
///
/// # Errors
///
/// - A rename entry for a variable the source does not advertise
/// - Two source variables ending up with the same output-facing name
pub fn resolve_pair(
    source_name: &str,
    variables: &[String],
    output_name: &str,
    renames: Option<&VariableRenames>,
    prefix_delimiter: Option<&str>,
) -> Result<ResolvedNames> {
    if let Some(renames) = renames {
        if let Some(unknown) = renames.keys().find(|from| !variables.contains(*from)) {
            return Err(Error::config(format!(
                "Rename of '{}' for source '{}' and output '{}': source has no such variable",
                unknown, source_name, output_name
            )));
        }
    }

    let mut names = Vec::with_capacity(variables.len());
    let mut index = HashMap::with_capacity(variables.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(variables.len());

    for variable in variables {
        let renamed = renames
            .and_then(|r| r.get(variable))
            .unwrap_or(variable);
        let target = match prefix_delimiter {
            Some(delimiter) => format!("{}{}{}", source_name, delimiter, renamed),
            None => renamed.clone(),
        };

        if !seen.insert(target.clone()) {
            return Err(Error::config(format!(
                "Ambiguous variable name '{}' for source '{}' and output '{}'",
                target, source_name, output_name
            )));
        }
        index.insert(variable.clone(), names.len());
        names.push((variable.clone(), target));
    }

    Ok(ResolvedNames { names, index })
}

/// Resolved variable names for every (source, output) pair
///
/// Pure metadata: computed once at logger construction and reused for every
/// round.
#[derive(Debug, Clone, Default)]
pub struct VariableNameTable {
    pairs: HashMap<String, HashMap<String, ResolvedNames>>,
}

impl VariableNameTable {
    /// Resolve and validate the names of every (source, output) pair
    ///
    /// # Parameters
    ///
    /// - `sources`: (source name, advertised variable names) in registry order
    /// - `outputs`: Output names in registry order
    /// - `rename`: Rename configuration
    /// - `prefix_delimiter`: Optional source-name prefix delimiter
    pub fn resolve(
        sources: &[(&str, &[String])],
        outputs: &[&str],
        rename: &RenameTable,
        prefix_delimiter: Option<&str>,
    ) -> Result<Self> {
        let source_names: Vec<&str> = sources.iter().map(|(name, _)| *name).collect();
        rename.validate_references(&source_names, outputs)?;

        let mut pairs = HashMap::with_capacity(sources.len());
        for (source_name, variables) in sources {
            let mut unique = HashSet::with_capacity(variables.len());
            if let Some(duplicate) = variables.iter().find(|v| !unique.insert(v.as_str())) {
                return Err(Error::config(format!(
                    "Source '{}' advertises variable '{}' more than once",
                    source_name, duplicate
                )));
            }

            let mut per_output = HashMap::with_capacity(outputs.len());
            for output_name in outputs {
                let resolved = resolve_pair(
                    source_name,
                    variables,
                    output_name,
                    rename.get(source_name, output_name),
                    prefix_delimiter,
                )?;
                per_output.insert(output_name.to_string(), resolved);
            }
            pairs.insert(source_name.to_string(), per_output);
        }

        Ok(Self { pairs })
    }

    /// Resolved names for a (source, output) pair
    pub fn get(&self, source_name: &str, output_name: &str) -> Option<&ResolvedNames> {
        self.pairs.get(source_name)?.get(output_name)
    }
}
