//! Binary Classifier Interface

use crate::InferenceError;
use serde::{Deserialize, Serialize};

/// Decision threshold used when the artifact does not carry one
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Result of classifying one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 for exoplanet candidate, 0 otherwise
    pub label: u8,
    /// Probability of the positive class (0.0 to 1.0)
    pub probability: f64,
}

/// A trained binary classifier over a fixed-width positional row.
///
/// Implementations are immutable after construction and shared across
/// request handlers without locking.
pub trait Classifier: Send + Sync {
    /// Number of features a row must contain
    fn n_features(&self) -> usize;

    /// Class distribution `[p(not exoplanet), p(exoplanet)]` for one row
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError>;

    /// Probability at or above which the label is 1
    fn decision_threshold(&self) -> f64 {
        DEFAULT_THRESHOLD
    }

    /// Label and positive-class probability for one row
    fn predict(&self, row: &[f64]) -> Result<Prediction, InferenceError> {
        if row.len() != self.n_features() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features(),
                actual: row.len(),
            });
        }

        let [_, positive] = self.predict_proba(row)?;
        if !positive.is_finite() || !(0.0..=1.0).contains(&positive) {
            return Err(InferenceError::InferenceFailed(format!(
                "probability {positive} outside [0, 1]"
            )));
        }

        let label = u8::from(positive >= self.decision_threshold());
        Ok(Prediction {
            label,
            probability: positive,
        })
    }
}
