//! Capture surface and captured photos

use crate::ChallengeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feature_engine::TargetPose;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque reference to a captured frame (e.g. a JPEG data URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedImage(String);

impl CapturedImage {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One photo of the challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    pub id: Uuid,
    /// Pose the photo was taken for
    pub pose: TargetPose,
    /// Position in the final strip
    pub slot: usize,
    pub captured_at: DateTime<Utc>,
    pub image: CapturedImage,
}

impl CapturedPhoto {
    pub fn new(pose: TargetPose, slot: usize, image: CapturedImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            pose,
            slot,
            captured_at: Utc::now(),
            image,
        }
    }
}

/// Reads the current camera frame as an image
#[async_trait]
pub trait FrameCapture: Send {
    async fn capture(&mut self) -> Result<CapturedImage, ChallengeError>;
}

/// Hands out numbered references instead of real frames.
///
/// Used for offline replays where no camera is attached.
#[derive(Debug, Clone)]
pub struct CountingCapture {
    prefix: String,
    taken: usize,
}

impl CountingCapture {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            taken: 0,
        }
    }

    pub fn taken(&self) -> usize {
        self.taken
    }
}

#[async_trait]
impl FrameCapture for CountingCapture {
    async fn capture(&mut self) -> Result<CapturedImage, ChallengeError> {
        self.taken += 1;
        Ok(CapturedImage::new(format!("{}://frame/{}", self.prefix, self.taken)))
    }
}
