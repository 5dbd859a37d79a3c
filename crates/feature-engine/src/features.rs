//! Feature Vector Assembly

use crate::geometry::{EyePair, EyeThresholds};
use crate::pose::{AuxiliarySignals, TargetPose};
use landmarks::{DetectionResult, Point2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Flattened landmark coordinates for one frame and one target pose.
///
/// Layout: body `x,y` pairs, then face, then hand (all hands in detector
/// order), then the pose's auxiliary scalars. The classifier was trained on
/// exactly this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Pose the vector was built for
    pub pose: TargetPose,
    /// Raw feature values
    pub values: Vec<f64>,
    /// Body keypoints contributing coordinates
    pub body_points: usize,
    /// Face keypoints contributing coordinates
    pub face_points: usize,
    /// Hand keypoints contributing coordinates
    pub hand_points: usize,
}

impl FeatureVector {
    /// Vector with no detection behind it
    pub fn empty(pose: TargetPose) -> Self {
        Self {
            pose,
            values: Vec::new(),
            body_points: 0,
            face_points: 0,
            hand_points: 0,
        }
    }

    /// An empty vector means "no detection"; it must never be classified
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Builds per-pose feature vectors from detector output
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    eye_thresholds: EyeThresholds,
}

impl FeatureExtractor {
    pub fn new(eye_thresholds: EyeThresholds) -> Self {
        Self { eye_thresholds }
    }

    /// Extract the feature vector for `pose` from one detection result
    pub fn extract(&self, detection: &DetectionResult, pose: TargetPose) -> FeatureVector {
        let groups = pose.landmark_groups();
        let mut vector = FeatureVector::empty(pose);

        if groups.body {
            if let Some(body) = detection.primary_body() {
                vector.body_points = push_points(&mut vector.values, &body.coordinates());
            }
        }

        if groups.face {
            if let Some(face) = detection.primary_face() {
                vector.face_points = push_points(&mut vector.values, &face.coordinates());
            }
        }

        if groups.hand {
            for hand in detection.hands() {
                vector.hand_points += push_points(&mut vector.values, &hand.coordinates());
            }
        }

        debug!(
            "[{} features] body={}, face={}, hand={}, total={}",
            pose,
            vector.body_points,
            vector.face_points,
            vector.hand_points,
            vector.values.len()
        );

        // Nothing relevant detected: no auxiliary signals either
        if vector.values.is_empty() {
            return vector;
        }

        match pose.auxiliary_signals() {
            AuxiliarySignals::None => {}
            AuxiliarySignals::EyeState => {
                let eyes = detection
                    .primary_face()
                    .map(|face| EyePair::measure(face, &self.eye_thresholds))
                    .unwrap_or_default();
                vector.values.extend_from_slice(&eyes.signals());
            }
            AuxiliarySignals::BodyLandmarkCount => {
                let count = detection
                    .primary_body()
                    .map(|body| body.coordinates().len())
                    .unwrap_or(0);
                vector.values.push(count as f64);
            }
        }

        vector
    }
}

fn push_points(values: &mut Vec<f64>, points: &[Point2]) -> usize {
    values.reserve(points.len() * 2);
    for p in points {
        values.push(p.x);
        values.push(p.y);
    }
    points.len()
}
