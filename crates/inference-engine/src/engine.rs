//! Inference Engine Implementation

use crate::classifier::{Classifier, Prediction};
use crate::forest::RandomForest;
use crate::InferenceError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Artifact location relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "model/random_forest.json";

/// Holds the process-wide classifier, or the reason there is none
pub struct InferenceEngine {
    /// Model path
    model_path: PathBuf,
    /// Loaded classifier, shared read-only
    model: Option<Arc<dyn Classifier>>,
    /// Why loading failed, when in degraded mode
    load_error: Option<InferenceError>,
}

impl InferenceEngine {
    /// Load the artifact at `path`.
    ///
    /// Never fails: a missing, corrupt, or incompatible artifact puts the
    /// engine in degraded mode and every prediction reports `ModelNotLoaded`.
    pub fn load(path: impl AsRef<Path>, expected_features: usize) -> Self {
        let path = path.as_ref();
        info!("Loading model artifact from {}", path.display());

        let loaded = RandomForest::from_path(path).and_then(|forest| {
            if forest.n_features() != expected_features {
                return Err(InferenceError::InvalidModel(format!(
                    "model expects {} features, column table has {}",
                    forest.n_features(),
                    expected_features
                )));
            }
            Ok(forest)
        });

        match loaded {
            Ok(forest) => {
                info!(
                    "Model loaded successfully: {} trees over {} features",
                    forest.tree_count(),
                    forest.n_features()
                );
                Self::with_model(path, Arc::new(forest))
            }
            Err(e) => {
                warn!("Model unavailable, starting in degraded mode: {}", e);
                Self::unloaded(path, e)
            }
        }
    }

    /// Engine around an already-built classifier
    pub fn with_model(path: impl Into<PathBuf>, model: Arc<dyn Classifier>) -> Self {
        Self {
            model_path: path.into(),
            model: Some(model),
            load_error: None,
        }
    }

    /// Engine in degraded mode
    pub fn unloaded(path: impl Into<PathBuf>, reason: InferenceError) -> Self {
        Self {
            model_path: path.into(),
            model: None,
            load_error: Some(reason),
        }
    }

    /// Run inference on a single positional row
    pub fn predict(&self, row: &[f64]) -> Result<Prediction, InferenceError> {
        let model = self.model.as_ref().ok_or(InferenceError::ModelNotLoaded)?;

        let start = Instant::now();
        let prediction = model.predict(row)?;
        debug!(
            "Inference completed in {}us: label={} p={:.4}",
            start.elapsed().as_micros(),
            prediction.label,
            prediction.probability
        );

        Ok(prediction)
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Why the model failed to load, if it did
    pub fn load_error(&self) -> Option<&InferenceError> {
        self.load_error.as_ref()
    }

    /// Get model path
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SINGLE_LEAF: &str = r#"{
        "n_features": 2,
        "trees": [{
            "children_left": [-1],
            "children_right": [-1],
            "feature": [-2],
            "threshold": [-2.0],
            "value": [[3.0, 1.0]]
        }]
    }"#;

    fn artifact(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_success() {
        let file = artifact(SINGLE_LEAF);
        let engine = InferenceEngine::load(file.path(), 2);

        assert!(engine.is_loaded());
        assert!(engine.load_error().is_none());
        let p = engine.predict(&[1.0, 2.0]).unwrap();
        assert_eq!(p.label, 0);
        assert_eq!(p.probability, 0.25);
    }

    #[test]
    fn test_missing_file_degrades() {
        let engine = InferenceEngine::load("model/does-not-exist.json", 36);

        assert!(!engine.is_loaded());
        assert!(matches!(
            engine.load_error(),
            Some(InferenceError::ModelLoadError(_))
        ));
        assert!(matches!(
            engine.predict(&[0.0; 36]),
            Err(InferenceError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_corrupt_file_degrades() {
        let file = artifact("not a model");
        let engine = InferenceEngine::load(file.path(), 2);
        assert!(!engine.is_loaded());
        assert_eq!(engine.model_path(), file.path());
    }

    #[test]
    fn test_feature_count_mismatch_degrades() {
        let file = artifact(SINGLE_LEAF);
        let engine = InferenceEngine::load(file.path(), 36);

        assert!(!engine.is_loaded());
        assert!(matches!(
            engine.load_error(),
            Some(InferenceError::InvalidModel(_))
        ));
    }
}
