//! Pose Classification Server
//!
//! Serves `POST /api/predict` for the pose challenge from samples recorded
//! on disk, plus sample counts and a health check.

use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod model;
mod routes;

pub use config::ServerConfig;
pub use error::ApiError;
pub use model::{ModelError, ModelParams, PoseModel, TrainingSet};

/// Application state shared across handlers
pub struct AppState {
    pub training: TrainingSet,
    /// `None` when the samples cannot support a model
    pub model: Option<PoseModel>,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(training: TrainingSet, params: ModelParams) -> Self {
        let model = match PoseModel::fit(&training, params) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!("No model available: {}", e);
                None
            }
        };

        Self {
            training,
            model,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: Option<&'static str>,
    pub samples: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/predict", post(routes::predict::predict))
        .route("/api/pose-counts", get(routes::poses::pose_counts))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.model.is_some() { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: state.model.as_ref().map(PoseModel::kind),
        samples: state.model.as_ref().map(PoseModel::samples).unwrap_or(0),
    })
}

/// Initialize logging
pub fn init_logging(config: &ServerConfig) -> anyhow::Result<()> {
    let level: Level = config.log_level.parse().unwrap_or(Level::INFO);

    let installed = if config.json_logs {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    installed.context("Failed to set tracing subscriber")
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let training = TrainingSet::load(&config.data_file)?;
    let state = Arc::new(AppState::new(training, config.model_params()));
    let app = create_router(state, &config.cors_origins);

    info!("Starting classification server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
