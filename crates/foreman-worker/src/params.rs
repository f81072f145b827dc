//! Parameter Merger
//!
//! Builds the effective parameter map handed to a worker at initialization:
//! worker-level parameters take strict precedence over global parameters,
//! and the first occurrence wins on duplicate names within a set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single named configuration value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable merged parameter map owned by a worker instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerParameters {
    values: HashMap<String, String>,
}

impl WorkerParameters {
    /// Merge worker-level and global parameters into an effective map.
    ///
    /// The worker's own parameters form the base (first-seen-wins on
    /// duplicates); each global parameter is added only if its name is not
    /// already present. Empty slices are valid inputs; this never fails.
    pub fn merge(worker_params: &[Parameter], global_params: &[Parameter]) -> Self {
        let mut values = HashMap::new();

        for param in worker_params {
            values
                .entry(param.name.clone())
                .or_insert_with(|| param.value.clone());
        }

        for param in global_params {
            values
                .entry(param.name.clone())
                .or_insert_with(|| param.value.clone());
        }

        Self { values }
    }

    /// Look up a parameter value by exact, case-sensitive name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a parameter with the given name is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all name/value pairs (arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
