//! Heuristic thresholds and score weights

use feature_engine::EyeThresholds;
use serde::{Deserialize, Serialize};

/// Heuristic validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Eye-closed thresholds (both eyes)
    pub eye: EyeThresholds,

    /// Composite score needed to pass (out of 100)
    pub pass_mark: f64,

    /// Points for exactly one closed eye
    pub wink_eye_points: f64,
    /// Classifier weight when it says "Wink"
    pub wink_label_weight: f64,
    /// Classifier weight when it says "Close up" (common confusion)
    pub wink_confusion_weight: f64,

    /// Lip gap / face height above which the mouth counts as open
    pub mouth_open_ratio: f64,
    /// Points for an open mouth
    pub surprise_mouth_points: f64,
    /// Points when the classifier says "Surprise"
    pub surprise_label_points: f64,

    /// Index/middle reach must exceed ring/pinky reach by this factor
    pub v_shape_ratio: f64,

    /// Body keypoints above this score count as visible
    pub torso_score: f64,
    /// Unnamed body keypoints at or past this index are below the face
    pub first_torso_index: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            eye: EyeThresholds::default(),
            pass_mark: 80.0,
            wink_eye_points: 70.0,
            wink_label_weight: 30.0,
            wink_confusion_weight: 20.0,
            mouth_open_ratio: 0.015,
            surprise_mouth_points: 50.0,
            surprise_label_points: 50.0,
            v_shape_ratio: 1.2,
            torso_score: 0.5,
            first_torso_index: 11,
        }
    }
}

impl HeuristicConfig {
    /// Map a passing score onto confidence: pass mark -> 0.8, 100 -> 1.0
    pub fn synthesized_confidence(&self, points: f64) -> f64 {
        let floor = self.pass_mark / 100.0;
        let span = (100.0 - self.pass_mark).max(f64::EPSILON);
        (floor + (points - self.pass_mark) / span * (1.0 - floor)).clamp(0.0, 1.0)
    }
}
