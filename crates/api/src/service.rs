//! Prediction Service
//!
//! Composes the column table and the inference engine. Records arriving here
//! have already been validated and completed with defaults.

use crate::error::PredictError;
use feature_schema::{ColumnOrder, FeatureRecord};
use inference_engine::InferenceEngine;
use serde::{Deserialize, Serialize};

/// Response body of a successful prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction_label: u8,
    pub prediction_probability_of_being_exoplanet: f64,
}

/// Single-row prediction over the process-wide model
pub struct PredictionService {
    engine: InferenceEngine,
    columns: ColumnOrder,
}

impl PredictionService {
    /// Service over the model's column order
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine,
            columns: ColumnOrder::model(),
        }
    }

    /// Classify one completed feature record
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, PredictError> {
        if !self.engine.is_loaded() {
            return Err(PredictError::ModelUnavailable);
        }

        let row = self.columns.project(record)?;
        let prediction = self.engine.predict(&row)?;

        Ok(PredictionResult {
            prediction_label: prediction.label,
            prediction_probability_of_being_exoplanet: prediction.probability,
        })
    }

    /// Whether a model is loaded
    pub fn is_model_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    /// Underlying engine
    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_schema::{FeatureSchema, MODEL_COLUMNS};
    use inference_engine::{Classifier, InferenceError};
    use std::sync::Arc;

    /// Positive exactly when koi_depth (column 12) exceeds 1000 ppm
    struct DepthStub;

    impl Classifier for DepthStub {
        fn n_features(&self) -> usize {
            MODEL_COLUMNS.len()
        }

        fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
            Ok(if row[12] > 1000.0 { [0.1, 0.9] } else { [0.7, 0.3] })
        }
    }

    fn record(depth: f64) -> FeatureRecord {
        let mut given = FeatureRecord::new();
        given.insert("koi_period", 9.48);
        given.insert("koi_depth", depth);
        given.insert("koi_duration", 2.95);
        given.insert("koi_prad", 2.26);
        given.insert("koi_teq", 793.0);
        FeatureSchema::embedded().unwrap().fill_defaults(given)
    }

    fn service() -> PredictionService {
        PredictionService::new(InferenceEngine::with_model("stub", Arc::new(DepthStub)))
    }

    #[test]
    fn test_predicts_from_projected_row() {
        let result = service().predict(&record(5000.0)).unwrap();
        assert_eq!(result.prediction_label, 1);
        assert_eq!(result.prediction_probability_of_being_exoplanet, 0.9);

        let result = service().predict(&record(10.0)).unwrap();
        assert_eq!(result.prediction_label, 0);
        assert_eq!(result.prediction_probability_of_being_exoplanet, 0.3);
    }

    #[test]
    fn test_degraded_mode() {
        let engine = InferenceEngine::unloaded(
            "model/random_forest.json",
            InferenceError::ModelLoadError("not found".to_string()),
        );
        let service = PredictionService::new(engine);

        assert!(!service.is_model_loaded());
        let err = service.predict(&record(5000.0)).unwrap_err();
        assert!(matches!(err, PredictError::ModelUnavailable));
        assert_eq!(err.to_string(), "Model not loaded. Cannot make predictions.");
    }

    #[test]
    fn test_incomplete_record_is_configuration_error() {
        let mut incomplete = record(5000.0);
        incomplete.remove("ra");

        let err = service().predict(&incomplete).unwrap_err();
        assert!(matches!(err, PredictError::Projection(_)));
    }
}
