//! Model Column Order

use crate::error::SchemaError;
use crate::schema::FeatureRecord;
use std::collections::BTreeSet;
use tracing::error;

/// Number of features the classifier consumes
pub const FEATURE_COUNT: usize = 36;

/// Feature names in the exact order the model was trained on.
/// `koi_score` is absent because it was dropped before training.
pub const MODEL_COLUMNS: [&str; FEATURE_COUNT] = [
    "koi_period", "koi_period_err1", "koi_period_err2", "koi_time0bk",
    "koi_time0bk_err1", "koi_time0bk_err2", "koi_impact", "koi_impact_err1",
    "koi_impact_err2", "koi_duration", "koi_duration_err1", "koi_duration_err2",
    "koi_depth", "koi_depth_err1", "koi_depth_err2", "koi_prad", "koi_prad_err1",
    "koi_prad_err2", "koi_teq", "koi_insol", "koi_insol_err1", "koi_insol_err2",
    "koi_model_snr", "koi_tce_plnt_num", "koi_steff", "koi_steff_err1",
    "koi_steff_err2", "koi_slogg", "koi_slogg_err1", "koi_slogg_err2",
    "koi_srad", "koi_srad_err1", "koi_srad_err2", "ra", "dec", "koi_kepmag",
];

/// Features every request must supply
pub const REQUIRED_FEATURES: [&str; 5] = [
    "koi_period",
    "koi_depth",
    "koi_duration",
    "koi_prad",
    "koi_teq",
];

/// Whether `name` is one of the required features
pub fn is_required(name: &str) -> bool {
    REQUIRED_FEATURES.contains(&name)
}

/// The 31 features that fall back to a training-set mean, in model order
pub fn optional_features() -> impl Iterator<Item = &'static str> {
    MODEL_COLUMNS.iter().copied().filter(|name| !is_required(name))
}

/// Ordered column table used to turn a record into a positional row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    names: Vec<String>,
}

impl ColumnOrder {
    /// The column order the deployed model expects
    pub fn model() -> Self {
        Self::new(MODEL_COLUMNS.iter().map(|s| s.to_string()).collect())
    }

    /// Build an arbitrary column order
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Column names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Project a completed record into a single positional row.
    ///
    /// The record's key set must equal the column set exactly. A mismatch is
    /// a configuration fault and is reported rather than padded or dropped.
    pub fn project(&self, record: &FeatureRecord) -> Result<Vec<f64>, SchemaError> {
        let mut row = Vec::with_capacity(self.names.len());
        let mut missing = Vec::new();

        for name in &self.names {
            match record.get(name) {
                Some(value) => row.push(value),
                None => missing.push(name.clone()),
            }
        }

        let known: BTreeSet<&str> = self.names.iter().map(String::as_str).collect();
        let unexpected: Vec<String> = record
            .names()
            .filter(|name| !known.contains(name))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            error!(?missing, ?unexpected, "Feature record does not match column table");
            return Err(SchemaError::ColumnMismatch { missing, unexpected });
        }

        Ok(row)
    }
}

impl Default for ColumnOrder {
    fn default() -> Self {
        Self::model()
    }
}
