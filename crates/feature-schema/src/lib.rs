//! Kepler Feature Schema
//!
//! Request validation, training-set defaults, and the column order the
//! exoplanet classifier was trained on.

mod columns;
mod defaults;
mod error;
mod schema;

pub use columns::{
    is_required, optional_features, ColumnOrder, FEATURE_COUNT, MODEL_COLUMNS,
    REQUIRED_FEATURES,
};
pub use defaults::FeatureDefaults;
pub use error::{FieldError, SchemaError, ValidationErrors};
pub use schema::{FeatureRecord, FeatureSchema};
