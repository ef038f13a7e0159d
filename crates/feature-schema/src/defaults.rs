//! Training-set Default Values
//!
//! Optional features fall back to their mean over the training set. The table
//! lives in a JSON resource rather than in the request type so a retrained
//! model only needs a new file.

use crate::columns::optional_features;
use crate::error::SchemaError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

const EMBEDDED_DEFAULTS: &str = include_str!("../resources/feature_defaults.json");

/// Validated mapping from each optional feature to its default value
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefaults {
    values: BTreeMap<String, f64>,
}

impl FeatureDefaults {
    /// Defaults compiled into the crate
    pub fn embedded() -> Result<Self, SchemaError> {
        Self::from_json_str(EMBEDDED_DEFAULTS)
    }

    /// Load defaults from a JSON file produced by `feature-means --defaults-only`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SchemaError::DefaultsIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let defaults = Self::from_json_str(&raw)?;
        info!("Loaded {} feature defaults from {}", defaults.len(), path.display());
        Ok(defaults)
    }

    /// Parse and validate a JSON object of `name -> mean`
    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        let values: BTreeMap<String, f64> =
            serde_json::from_str(raw).map_err(|e| SchemaError::DefaultsParse(e.to_string()))?;
        Self::from_map(values)
    }

    /// Validate an in-memory table
    pub fn from_map(values: BTreeMap<String, f64>) -> Result<Self, SchemaError> {
        let expected: BTreeSet<&str> = optional_features().collect();

        let missing: Vec<String> = expected
            .iter()
            .filter(|name| !values.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        let unexpected: Vec<String> = values
            .keys()
            .filter(|name| !expected.contains(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(SchemaError::DefaultsMismatch { missing, unexpected });
        }

        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SchemaError::NonFiniteDefault(name.clone()));
        }

        debug!("Feature defaults validated: {} entries", values.len());
        Ok(Self { values })
    }

    /// Default for one feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Iterate `(name, default)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of defaults
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
