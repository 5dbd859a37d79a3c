//! Per-frame detection results

use crate::keypoint::{coordinates, Keypoint, Point2};
use serde::{Deserialize, Serialize};

/// Body (skeleton) detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyDetection {
    /// Ordered body keypoints
    #[serde(default, alias = "pose")]
    pub keypoints: Vec<Keypoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Face mesh detection (~468 keypoints)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Ordered mesh keypoints
    #[serde(default, alias = "mesh")]
    pub keypoints: Vec<Keypoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Hand detection (21 keypoints)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    /// Ordered hand keypoints, wrist first
    #[serde(default, alias = "landmarks", alias = "points")]
    pub keypoints: Vec<Keypoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Handedness label, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

macro_rules! keypoint_access {
    ($ty:ty) => {
        impl $ty {
            /// Create from ordered keypoints
            pub fn new(keypoints: Vec<Keypoint>) -> Self {
                Self {
                    keypoints,
                    ..Default::default()
                }
            }

            /// Coordinate of the keypoint at `index`, if present and resolvable
            pub fn point(&self, index: usize) -> Option<Point2> {
                self.keypoints.get(index).and_then(Keypoint::coordinate)
            }

            /// All resolvable coordinates in keypoint order
            pub fn coordinates(&self) -> Vec<Point2> {
                coordinates(&self.keypoints)
            }
        }
    };
}

keypoint_access!(BodyDetection);
keypoint_access!(FaceDetection);
keypoint_access!(HandDetection);

/// Everything the detector found in one video frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub body: Vec<BodyDetection>,

    #[serde(default)]
    pub face: Vec<FaceDetection>,

    #[serde(default)]
    pub hand: Vec<HandDetection>,
}

impl DetectionResult {
    /// Empty result (nothing detected)
    pub fn empty() -> Self {
        Self::default()
    }

    /// First body entry; later entries are ignored
    pub fn primary_body(&self) -> Option<&BodyDetection> {
        self.body.first()
    }

    /// First face entry; later entries are ignored
    pub fn primary_face(&self) -> Option<&FaceDetection> {
        self.face.first()
    }

    /// All detected hands
    pub fn hands(&self) -> &[HandDetection] {
        &self.hand
    }

    /// Whether any group produced any entry
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.face.is_empty() && self.hand.is_empty()
    }

    pub fn with_body(mut self, body: BodyDetection) -> Self {
        self.body.push(body);
        self
    }

    pub fn with_face(mut self, face: FaceDetection) -> Self {
        self.face.push(face);
        self
    }

    pub fn with_hand(mut self, hand: HandDetection) -> Self {
        self.hand.push(hand);
        self
    }
}
