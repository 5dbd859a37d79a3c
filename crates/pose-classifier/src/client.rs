//! HTTP classifier client

use crate::wire::{ErrorDetail, PredictRequest, PredictResponse};
use crate::{ClassifierError, PoseClassifier, Prediction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Classifier endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Service root, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 2000,
        }
    }
}

/// Talks to `POST {base_url}/api/predict`
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let endpoint = format!("{}/api/predict", config.base_url.trim_end_matches('/'));
        info!("Classifier endpoint: {}", endpoint);

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PoseClassifier for HttpClassifier {
    async fn predict(&self, features: &[f64]) -> Result<Prediction, ClassifierError> {
        if features.is_empty() {
            return Err(ClassifierError::EmptyFeatures);
        }

        let request = PredictRequest {
            features: features.to_vec(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ErrorDetail>().await {
                Ok(body) => body.detail,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            };
            warn!("Classifier returned {}: {}", status, detail);
            return Err(ClassifierError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;

        debug!("Classifier: {} ({:.2})", body.pose, body.confidence);
        Ok(Prediction::new(body.pose, body.confidence))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
