//! Keypoint Detections
//!
//! Data model for the output of the external body/face/hand landmark
//! detector, plus the `Detector` seam the pose challenge pulls frames from:
//! - Keypoints in any of the shapes the detector emits
//! - Per-frame detection results (body, face, hand entries)
//! - Replay of recorded detections for offline runs

pub mod detection;
pub mod keypoint;
pub mod replay;

pub use detection::{BodyDetection, DetectionResult, FaceDetection, HandDetection};
pub use keypoint::{Keypoint, Point2, PointKeypoint};
pub use replay::ReplayDetector;

use async_trait::async_trait;
use thiserror::Error;

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector initialization failed: {0}")]
    Init(String),

    #[error("Detector not initialized")]
    NotInitialized,

    #[error("No video frame available")]
    FrameUnavailable,

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Malformed detection on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Source of per-frame keypoint detections.
///
/// Implementations own the video surface they read from; the pose challenge
/// only sees the resulting `DetectionResult`.
#[async_trait]
pub trait Detector: Send {
    /// Load models and warm up. Failure here is fatal to a session.
    async fn initialize(&mut self) -> Result<(), DetectorError>;

    /// Run detection on the current video frame
    async fn detect(&mut self) -> Result<DetectionResult, DetectorError>;

    /// Release detector resources. Safe to call more than once.
    async fn dispose(&mut self);

    /// Detector name for logging
    fn name(&self) -> &'static str;
}
