//! Exoplanet Inference Engine
//!
//! Loads the exported random-forest classifier once at startup and serves
//! single-row predictions. A missing or broken artifact leaves the engine in
//! degraded mode instead of aborting the process.

mod classifier;
mod engine;
mod forest;

pub use classifier::{Classifier, Prediction, DEFAULT_THRESHOLD};
pub use engine::{InferenceEngine, DEFAULT_MODEL_PATH};
pub use forest::{DecisionTree, RandomForest};

use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Model not loaded. Cannot make predictions.")]
    ModelNotLoaded,
    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}
