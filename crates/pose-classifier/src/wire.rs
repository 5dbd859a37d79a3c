//! JSON bodies exchanged with the classification service

use serde::{Deserialize, Serialize};

/// `POST /api/predict` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

/// `POST /api/predict` success response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub pose: String,
    pub confidence: f64,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
