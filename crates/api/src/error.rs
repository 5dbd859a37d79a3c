use crate::model::ModelError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pose_classifier::wire::ErrorDetail;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No trained model available")]
    NoModel,
    #[error("{0}")]
    InvalidFeatures(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoModel => StatusCode::NOT_FOUND,
            ApiError::InvalidFeatures(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::LengthMismatch { .. } | ModelError::EmptyFeatures => {
                ApiError::InvalidFeatures(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed ({}): {}", status, self);
        (status, Json(ErrorDetail::new(self.to_string()))).into_response()
    }
}
