//! Pose Feature Engine
//!
//! Turns one frame of detector output into the numeric vector the pose
//! classifier was trained on, and exposes the geometry signals the
//! heuristic checks reuse.

mod features;
pub mod geometry;
mod pose;

pub use features::{FeatureExtractor, FeatureVector};
pub use geometry::{EyeMetrics, EyePair, EyeThresholds, FingerSpread};
pub use pose::{AuxiliarySignals, FusionPolicy, LandmarkGroups, TargetPose};

use thiserror::Error;

/// Feature engine errors
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Unknown pose label: {0}")]
    UnknownPose(String),
}
