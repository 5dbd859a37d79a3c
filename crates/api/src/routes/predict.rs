//! Pose prediction endpoint

use crate::{error::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use pose_classifier::wire::{PredictRequest, PredictResponse};
use std::sync::Arc;
use tracing::debug;

/// `POST /api/predict`
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidFeatures(e.body_text()))?;
    let model = state.model.as_ref().ok_or(ApiError::NoModel)?;

    let prediction = model.predict(&request.features)?;
    debug!(
        "Predicted {} ({:.2}) from {} features",
        prediction.label,
        prediction.confidence,
        request.features.len()
    );

    Ok(Json(PredictResponse {
        pose: prediction.label,
        confidence: prediction.confidence,
    }))
}
