//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feature_schema::{SchemaError, ValidationErrors};
use inference_engine::InferenceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors from the prediction path
#[derive(Debug, Error)]
pub enum PredictError {
    /// Service is in degraded mode
    #[error("Model not loaded. Cannot make predictions.")]
    ModelUnavailable,
    /// Completed record did not line up with the column table
    #[error("Feature projection failed: {0}")]
    Projection(#[from] SchemaError),
    /// The classifier rejected the row or produced garbage
    #[error("{0}")]
    Inference(InferenceError),
    /// The inference task panicked or was cancelled
    #[error("Inference task failed: {0}")]
    Aborted(String),
}

impl From<InferenceError> for PredictError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::ModelNotLoaded => PredictError::ModelUnavailable,
            other => PredictError::Inference(other),
        }
    }
}

impl PredictError {
    /// Short label for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            PredictError::ModelUnavailable => "model_unavailable",
            PredictError::Projection(_) => "projection_error",
            PredictError::Inference(_) => "inference_error",
            PredictError::Aborted(_) => "aborted",
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        // Degraded mode is a normal answer, not an HTTP failure
        let status = match &self {
            PredictError::ModelUnavailable => StatusCode::OK,
            _ => {
                error!("Prediction failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Request body failed schema validation
#[derive(Debug)]
pub struct ValidationRejection(pub ValidationErrors);

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self.0)).into_response()
    }
}

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid feature defaults: {0}")]
    Defaults(#[from] SchemaError),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
