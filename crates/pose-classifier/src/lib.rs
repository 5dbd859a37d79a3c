//! Pose Classifier Client
//!
//! The remote classifier is an opaque scoring oracle: a feature vector goes
//! in, a `(label, confidence)` pair comes out.

mod client;
mod mock;
pub mod wire;

pub use client::{ClassifierConfig, HttpClassifier};
pub use mock::MockClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a classification request
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Classifier unreachable: {0}")]
    Transport(String),
    #[error("Classifier rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("Malformed classifier response: {0}")]
    Decode(String),
    #[error("Refusing to classify an empty feature vector")]
    EmptyFeatures,
}

impl ClassifierError {
    /// Short text suitable for the status line
    pub fn detail(&self) -> String {
        match self {
            ClassifierError::Rejected { detail, .. } => detail.clone(),
            ClassifierError::Transport(message) | ClassifierError::Decode(message) => {
                message.clone()
            }
            ClassifierError::EmptyFeatures => "No features".to_string(),
        }
    }
}

/// Raw classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted pose label, or "Unknown"
    pub label: String,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Anything that can score a feature vector
#[async_trait]
pub trait PoseClassifier: Send + Sync {
    /// Classify one feature vector. Callers must not pass an empty slice.
    async fn predict(&self, features: &[f64]) -> Result<Prediction, ClassifierError>;

    /// Classifier name for logging
    fn name(&self) -> &'static str;
}
