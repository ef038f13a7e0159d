//! Schema Error Types

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the feature schema and the column projection
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Value could not be read as a float
    #[error("{field} is not a valid float (got {found})")]
    InvalidType { field: String, found: String },

    /// Record keys do not match the model column table
    #[error("Record does not match model columns: missing {missing:?}, unexpected {unexpected:?}")]
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Defaults table does not cover exactly the optional features
    #[error("Defaults table mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    DefaultsMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Default value is NaN or infinite
    #[error("Default for {0} is not a finite number")]
    NonFiniteDefault(String),

    /// Defaults file could not be read
    #[error("Failed to read defaults file {path}: {reason}")]
    DefaultsIo { path: String, reason: String },

    /// Defaults file is not a JSON object of numbers
    #[error("Failed to parse defaults: {0}")]
    DefaultsParse(String),
}

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Location of the offending value, e.g. `["body", "koi_period"]`
    pub loc: Vec<String>,
    /// Human readable message
    pub msg: String,
    /// Machine readable error kind
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// A required field was absent
    pub fn missing(field: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: "field required".to_string(),
            kind: "value_error.missing".to_string(),
        }
    }

    /// A field held something other than a float
    pub fn not_a_float(field: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: "value is not a valid float".to_string(),
            kind: "type_error.float".to_string(),
        }
    }

    /// The body was not valid JSON
    pub fn invalid_json(reason: &str) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: format!("invalid JSON: {reason}"),
            kind: "value_error.jsondecode".to_string(),
        }
    }

    /// The body was JSON but not an object
    pub fn not_an_object() -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: "value is not a valid dict".to_string(),
            kind: "type_error.dict".to_string(),
        }
    }

    /// The field this error points at, if any
    pub fn field(&self) -> Option<&str> {
        self.loc.get(1).map(String::as_str)
    }
}

/// All field-level failures for one request body
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{} validation error(s)", detail.len())]
pub struct ValidationErrors {
    pub detail: Vec<FieldError>,
}

impl ValidationErrors {
    /// Wrap a single error
    pub fn single(error: FieldError) -> Self {
        Self {
            detail: vec![error],
        }
    }

    /// Whether any error points at `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.detail.iter().any(|e| e.field() == Some(field))
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self::single(error)
    }
}

impl From<SchemaError> for FieldError {
    fn from(error: SchemaError) -> Self {
        match error {
            SchemaError::MissingField(field) => Self::missing(&field),
            SchemaError::InvalidType { field, .. } => Self::not_a_float(&field),
            other => Self {
                loc: vec!["body".to_string()],
                msg: other.to_string(),
                kind: "value_error".to_string(),
            },
        }
    }
}
