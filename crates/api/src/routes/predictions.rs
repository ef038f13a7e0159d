//! Prediction Routes

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    response::{IntoResponse, Response},
    Json,
};
use feature_schema::FeatureRecord;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::{PredictError, ValidationRejection};
use crate::service::PredictionResult;
use crate::AppState;

/// Request body validated against the feature schema and completed with
/// training-set defaults
#[derive(Debug)]
pub struct ValidatedFeatures(pub FeatureRecord);

#[async_trait]
impl FromRequest<Arc<AppState>> for ValidatedFeatures {
    type Rejection = Response;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        state
            .schema
            .parse_slice(&body)
            .map(ValidatedFeatures)
            .map_err(|errors| {
                debug!("Rejected prediction request: {}", errors);
                ValidationRejection(errors).into_response()
            })
    }
}

/// Classify one candidate
pub async fn predict(
    State(state): State<Arc<AppState>>,
    ValidatedFeatures(record): ValidatedFeatures,
) -> Result<Json<PredictionResult>, PredictError> {
    let service = Arc::clone(&state.service);
    let start = Instant::now();

    // A panic inside the model surfaces as a JoinError instead of tearing
    // down the connection
    let result = match tokio::task::spawn_blocking(move || service.predict(&record)).await {
        Ok(result) => result,
        Err(e) => Err(PredictError::Aborted(e.to_string())),
    };

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    metrics::histogram!("exoplanet_inference_seconds").record(start.elapsed().as_secs_f64());
    metrics::counter!("exoplanet_predictions_total", "outcome" => outcome).increment(1);

    result.map(Json)
}
