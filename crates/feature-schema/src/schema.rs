//! Request Validation and Defaulting

use crate::columns::{is_required, MODEL_COLUMNS};
use crate::defaults::FeatureDefaults;
use crate::error::{FieldError, SchemaError, ValidationErrors};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Named feature values for a single prediction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    values: BTreeMap<String, f64>,
}

impl FeatureRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of one feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Set a feature, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Remove a feature
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    /// Whether the feature is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Feature names present in the record
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of features present
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Inbound schema: required-field checks, float coercion, and defaults
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    defaults: FeatureDefaults,
}

impl FeatureSchema {
    /// Schema backed by the given defaults table
    pub fn new(defaults: FeatureDefaults) -> Self {
        Self { defaults }
    }

    /// Schema backed by the defaults compiled into the crate
    pub fn embedded() -> Result<Self, SchemaError> {
        Ok(Self::new(FeatureDefaults::embedded()?))
    }

    /// Defaults table in use
    pub fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    /// Validate a decoded JSON body and complete it with defaults.
    ///
    /// Every field is checked and all failures are reported together.
    /// Keys that are not model features are ignored.
    pub fn parse(&self, body: &Map<String, Value>) -> Result<FeatureRecord, ValidationErrors> {
        let mut given = FeatureRecord::new();
        let mut errors = Vec::new();

        for name in MODEL_COLUMNS {
            match body.get(name) {
                Some(value) => match coerce_float(name, value) {
                    Ok(v) => {
                        given.insert(name, v);
                    }
                    Err(e) => errors.push(FieldError::from(e)),
                },
                None if is_required(name) => {
                    errors.push(FieldError::from(SchemaError::MissingField(name.to_string())));
                }
                None => {}
            }
        }

        for key in body.keys().filter(|k| !MODEL_COLUMNS.contains(&k.as_str())) {
            debug!("Ignoring unknown request field: {}", key);
        }

        if !errors.is_empty() {
            return Err(ValidationErrors { detail: errors });
        }

        Ok(self.fill_defaults(given))
    }

    /// Decode raw JSON bytes, then [`parse`](Self::parse) them
    pub fn parse_slice(&self, bytes: &[u8]) -> Result<FeatureRecord, ValidationErrors> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| FieldError::invalid_json(&e.to_string()))?;

        match value {
            Value::Object(body) => self.parse(&body),
            _ => Err(FieldError::not_an_object().into()),
        }
    }

    /// Add every absent optional feature from the defaults table.
    /// Supplied values always win; required features are never defaulted.
    pub fn fill_defaults(&self, mut given: FeatureRecord) -> FeatureRecord {
        for (name, default) in self.defaults.iter() {
            if !given.contains(name) {
                given.insert(name, default);
            }
        }
        given
    }
}

/// Lax float coercion: JSON numbers and numeric strings, finite only
fn coerce_float(field: &str, value: &Value) -> Result<f64, SchemaError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(SchemaError::InvalidType {
            field: field.to_string(),
            found: value.to_string(),
        }),
    }
}
