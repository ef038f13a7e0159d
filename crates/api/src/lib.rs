//! Exoplanet Prediction API Server
//!
//! Serves the Kepler exoplanet-candidate classifier over HTTP.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use feature_schema::{FeatureDefaults, FeatureSchema, FEATURE_COUNT};
use inference_engine::InferenceEngine;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod routes;
pub mod service;

pub use config::ApiConfig;
pub use error::{PredictError, StartupError};
pub use service::{PredictionResult, PredictionService};

/// Application state shared across handlers; read-only after startup
pub struct AppState {
    /// Inbound request schema with its defaults table
    pub schema: FeatureSchema,
    /// Prediction service over the loaded model
    pub service: Arc<PredictionService>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state from its parts
    pub fn new(schema: FeatureSchema, engine: InferenceEngine) -> Self {
        Self {
            schema,
            service: Arc::new(PredictionService::new(engine)),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Load defaults and the model as configured.
    ///
    /// A bad defaults table is fatal; a bad model only degrades the service.
    pub fn from_config(config: &ApiConfig) -> Result<Self, StartupError> {
        let defaults = match &config.defaults_path {
            Some(path) => FeatureDefaults::from_path(path)?,
            None => FeatureDefaults::embedded()?,
        };
        let engine = InferenceEngine::load(&config.model_path, FEATURE_COUNT);

        Ok(Self::new(FeatureSchema::new(defaults), engine))
    }

    /// Attach a Prometheus handle
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_path: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/predict", post(routes::predictions::predict))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness message
async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Exoplanet Prediction API is running." }))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = state.service.engine();
    let model_loaded = engine.is_loaded();

    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" },
        model_loaded,
        model_path: engine.model_path().display().to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &ApiConfig) -> Result<(), StartupError> {
    let level: Level = config
        .log_level
        .parse()
        .map_err(|_| StartupError::Logging(format!("unknown log level '{}'", config.log_level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.map_err(|e| StartupError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, StartupError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| StartupError::Metrics(e.to_string()))
}

/// Run the server
pub async fn run_server(config: ApiConfig) -> Result<(), StartupError> {
    let metrics = if config.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    let state = Arc::new(AppState::from_config(&config)?.with_metrics(metrics));
    let app = create_router(state);

    let addr = config.bind_addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
