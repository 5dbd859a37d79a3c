//! Per-pose geometric checks over raw detector output

use crate::config::HeuristicConfig;
use feature_engine::geometry::mouth_open_ratio;
use feature_engine::{EyePair, FingerSpread, TargetPose};
use landmarks::{DetectionResult, Keypoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body part names that still belong to a close-cropped face
const FACIAL_PARTS: [&str; 4] = ["nose", "eye", "ear", "face"];

/// Outcome of a heuristic check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the classifier output was replaced
    pub overridden: bool,
    /// Label to report (the classifier's unless forced)
    pub label: Option<String>,
    /// Confidence to report
    pub confidence: f64,
    /// Composite score, for poses scored out of 100
    pub points: Option<f64>,
}

impl Verdict {
    fn keep(label: &str, confidence: f64) -> Self {
        Self {
            overridden: false,
            label: Some(label.to_string()),
            confidence,
            points: None,
        }
    }

    fn reject(label: &str, points: Option<f64>) -> Self {
        Self {
            overridden: true,
            label: Some(label.to_string()),
            confidence: 0.0,
            points,
        }
    }

    fn accept(pose: TargetPose, confidence: f64, points: f64) -> Self {
        Self {
            overridden: true,
            label: Some(pose.as_str().to_string()),
            confidence,
            points: Some(points),
        }
    }

    /// Confidence was forced to zero
    pub fn is_rejection(&self) -> bool {
        self.overridden && self.confidence == 0.0
    }
}

/// Confirms or vetoes classifier output using landmark geometry
#[derive(Debug, Clone, Default)]
pub struct HeuristicValidator {
    config: HeuristicConfig,
}

impl HeuristicValidator {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Check one classifier result against the detection it came from
    pub fn validate(
        &self,
        detection: &DetectionResult,
        pose: TargetPose,
        label: &str,
        raw_confidence: f64,
    ) -> Verdict {
        match pose {
            TargetPose::Wink => self.validate_wink(detection, label, raw_confidence),
            TargetPose::Surprise => self.validate_surprise(detection, label),
            TargetPose::CloseUp => {
                if self.torso_visible(detection) {
                    debug!("[Close up] torso landmarks visible, rejecting");
                    Verdict::reject(label, None)
                } else {
                    Verdict::keep(label, raw_confidence)
                }
            }
            TargetPose::VSign => {
                if self.has_v_hand(detection) {
                    Verdict::keep(label, raw_confidence)
                } else {
                    debug!("[V sign] no hand with a V shape, rejecting");
                    Verdict::reject(label, None)
                }
            }
            TargetPose::Background => Verdict::keep(label, raw_confidence),
        }
    }

    fn validate_wink(
        &self,
        detection: &DetectionResult,
        label: &str,
        raw_confidence: f64,
    ) -> Verdict {
        let eyes = detection
            .primary_face()
            .map(|face| EyePair::measure(face, &self.config.eye))
            .unwrap_or_default();

        let mut points = 0.0;
        if eyes.is_wink() {
            points += self.config.wink_eye_points;
        }
        if TargetPose::Wink.matches_label(label) {
            points += raw_confidence * self.config.wink_label_weight;
        } else if TargetPose::CloseUp.matches_label(label) {
            points += raw_confidence * self.config.wink_confusion_weight;
        }

        debug!(
            "[Wink] eye xor={}, label={}, raw={:.2}, points={:.1}",
            eyes.is_wink(),
            label,
            raw_confidence,
            points
        );
        self.score(TargetPose::Wink, label, points)
    }

    fn validate_surprise(&self, detection: &DetectionResult, label: &str) -> Verdict {
        let ratio = detection.primary_face().and_then(mouth_open_ratio);

        let mut points = 0.0;
        if ratio.is_some_and(|r| r > self.config.mouth_open_ratio) {
            points += self.config.surprise_mouth_points;
        }
        if TargetPose::Surprise.matches_label(label) {
            points += self.config.surprise_label_points;
        }

        debug!("[Surprise] mouth ratio={:?}, label={}, points={:.1}", ratio, label, points);
        self.score(TargetPose::Surprise, label, points)
    }

    fn score(&self, pose: TargetPose, label: &str, points: f64) -> Verdict {
        if points >= self.config.pass_mark {
            Verdict::accept(pose, self.config.synthesized_confidence(points), points)
        } else {
            Verdict::reject(label, Some(points))
        }
    }

    /// Any confidently detected body landmark below the face
    fn torso_visible(&self, detection: &DetectionResult) -> bool {
        detection.body.iter().any(|body| {
            body.keypoints.iter().enumerate().any(|(index, keypoint)| {
                !self.is_facial(index, keypoint)
                    && keypoint.score().is_some_and(|s| s > self.config.torso_score)
            })
        })
    }

    fn is_facial(&self, index: usize, keypoint: &Keypoint) -> bool {
        match keypoint.part_name() {
            Some(name) => {
                let name = name.to_ascii_lowercase();
                FACIAL_PARTS.iter().any(|part| name.contains(part))
            }
            None => index < self.config.first_torso_index,
        }
    }

    fn has_v_hand(&self, detection: &DetectionResult) -> bool {
        detection
            .hands()
            .iter()
            .filter_map(FingerSpread::measure)
            .any(|spread| spread.is_v_shape(self.config.v_shape_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::geometry::{
        CHIN, INDEX_TIP, LEFT_EYE, LOWER_LIP, MIDDLE_TIP, NOSE_TIP, PINKY_TIP, RIGHT_EYE,
        RING_TIP, UPPER_LIP,
    };
    use landmarks::{BodyDetection, FaceDetection, HandDetection};
    use proptest::prelude::*;

    fn eye(indices: &[usize; 6], cx: f64, height: f64) -> Vec<(usize, f64, f64)> {
        vec![
            (indices[0], cx - 15.0, 100.0),
            (indices[1], cx - 5.0, 100.0 - height / 2.0),
            (indices[2], cx + 5.0, 100.0 - height / 2.0),
            (indices[3], cx + 15.0, 100.0),
            (indices[4], cx + 5.0, 100.0 + height / 2.0),
            (indices[5], cx - 5.0, 100.0 + height / 2.0),
        ]
    }

    fn face(points: &[(usize, f64, f64)]) -> DetectionResult {
        let mut keypoints = vec![Keypoint::Missing; 468];
        for &(i, x, y) in points {
            keypoints[i] = Keypoint::xy(x, y);
        }
        DetectionResult::empty().with_face(FaceDetection::new(keypoints))
    }

    fn eyes(left_height: f64, right_height: f64) -> DetectionResult {
        let mut points = eye(&LEFT_EYE, 200.0, left_height);
        points.extend(eye(&RIGHT_EYE, 300.0, right_height));
        face(&points)
    }

    fn mouth(gap: f64) -> DetectionResult {
        face(&[
            (NOSE_TIP, 100.0, 100.0),
            (CHIN, 100.0, 300.0),
            (UPPER_LIP, 100.0, 200.0),
            (LOWER_LIP, 100.0, 200.0 + gap),
        ])
    }

    fn hand(open: f64, closed: f64) -> HandDetection {
        let mut keypoints = vec![Keypoint::xy(0.0, 0.0); 21];
        keypoints[INDEX_TIP] = Keypoint::xy(0.0, open);
        keypoints[MIDDLE_TIP] = Keypoint::xy(0.0, open);
        keypoints[RING_TIP] = Keypoint::xy(0.0, closed);
        keypoints[PINKY_TIP] = Keypoint::xy(0.0, closed);
        HandDetection::new(keypoints)
    }

    #[test]
    fn test_wink_passes_with_modest_confidence() {
        let validator = HeuristicValidator::default();
        let verdict = validator.validate(&eyes(10.0, 2.0), TargetPose::Wink, "Wink", 0.34);

        assert!(verdict.overridden);
        assert_eq!(verdict.label.as_deref(), Some("Wink"));
        let points = verdict.points.unwrap();
        assert!((points - 80.2).abs() < 1e-9);
        assert!((verdict.confidence - (0.8 + (0.2 / 20.0) * 0.2)).abs() < 1e-9);
        assert!(verdict.confidence >= 0.67);
    }

    #[test]
    fn test_wink_without_eye_signal_is_rejected() {
        let validator = HeuristicValidator::default();
        let verdict = validator.validate(&eyes(10.0, 10.0), TargetPose::Wink, "Wink", 1.0);

        assert!(verdict.is_rejection());
        assert_eq!(verdict.points, Some(30.0));
        assert_eq!(verdict.label.as_deref(), Some("Wink"));
    }

    #[test]
    fn test_wink_rescues_close_up_confusion() {
        let validator = HeuristicValidator::default();
        let verdict = validator.validate(&eyes(2.0, 10.0), TargetPose::Wink, "Close up", 0.6);

        assert!((verdict.points.unwrap() - 82.0).abs() < 1e-9);
        assert_eq!(verdict.label.as_deref(), Some("Wink"));
        assert!((verdict.confidence - 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_wink_full_marks() {
        let verdict =
            HeuristicValidator::default().validate(&eyes(10.0, 2.0), TargetPose::Wink, "Wink", 1.0);
        assert_eq!(verdict.points, Some(100.0));
        assert!((verdict.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wink_other_label_scores_eyes_only() {
        let verdict = HeuristicValidator::default().validate(
            &eyes(10.0, 2.0),
            TargetPose::Wink,
            "Surprise",
            0.99,
        );
        assert_eq!(verdict.points, Some(70.0));
        assert!(verdict.is_rejection());
    }

    #[test]
    fn test_surprise_needs_both_signals() {
        let validator = HeuristicValidator::default();

        let both = validator.validate(&mouth(10.0), TargetPose::Surprise, "Surprise", 0.2);
        assert_eq!(both.points, Some(100.0));
        assert_eq!(both.label.as_deref(), Some("Surprise"));
        assert!((both.confidence - 1.0).abs() < 1e-9);

        let closed_mouth = validator.validate(&mouth(1.0), TargetPose::Surprise, "Surprise", 0.95);
        assert_eq!(closed_mouth.points, Some(50.0));
        assert!(closed_mouth.is_rejection());

        let wrong_label = validator.validate(&mouth(10.0), TargetPose::Surprise, "Wink", 0.95);
        assert_eq!(wrong_label.points, Some(50.0));
        assert!(wrong_label.is_rejection());
    }

    #[test]
    fn test_surprise_mouth_threshold_is_strict() {
        let validator = HeuristicValidator::default();

        // 3 / 200 sits exactly on the threshold
        let at_threshold = validator.validate(&mouth(3.0), TargetPose::Surprise, "Surprise", 0.9);
        assert!(at_threshold.is_rejection());
        assert_eq!(at_threshold.points, Some(50.0));

        let above = validator.validate(&mouth(3.2), TargetPose::Surprise, "Surprise", 0.9);
        assert!(!above.is_rejection());
        assert_eq!(above.points, Some(100.0));
    }

    #[test]
    fn test_close_up_vetoed_by_named_torso() {
        let validator = HeuristicValidator::default();
        let body = BodyDetection::new(vec![
            Keypoint::part("nose", 1.0, 1.0, 0.99),
            Keypoint::part("leftEye", 1.0, 1.0, 0.99),
            Keypoint::part("leftShoulder", 1.0, 5.0, 0.7),
        ]);
        let frame = DetectionResult::empty().with_body(body);
        let verdict = validator.validate(&frame, TargetPose::CloseUp, "Close up", 0.9);
        assert!(verdict.is_rejection());
    }

    #[test]
    fn test_close_up_kept_when_torso_faint() {
        let validator = HeuristicValidator::default();
        let body = BodyDetection::new(vec![
            Keypoint::part("nose", 1.0, 1.0, 0.99),
            Keypoint::part("rightEar", 1.0, 1.0, 0.9),
            Keypoint::part("leftShoulder", 1.0, 5.0, 0.5),
            Keypoint::part("rightHip", 1.0, 9.0, 0.1),
        ]);
        let frame = DetectionResult::empty().with_body(body);
        let verdict = validator.validate(&frame, TargetPose::CloseUp, "Close up", 0.9);
        assert!(!verdict.overridden);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.label.as_deref(), Some("Close up"));
    }

    #[test]
    fn test_close_up_unnamed_uses_index() {
        let validator = HeuristicValidator::default();
        let mut keypoints = vec![Keypoint::scored(0.0, 0.0, 0.95); 11];
        keypoints.push(Keypoint::scored(0.0, 0.0, 0.2));
        let face_only = DetectionResult::empty().with_body(BodyDetection::new(keypoints.clone()));
        assert!(!validator.validate(&face_only, TargetPose::CloseUp, "Close up", 0.8).overridden);

        keypoints.push(Keypoint::scored(0.0, 0.0, 0.6));
        let with_shoulder = DetectionResult::empty().with_body(BodyDetection::new(keypoints));
        assert!(validator
            .validate(&with_shoulder, TargetPose::CloseUp, "Close up", 0.8)
            .is_rejection());
    }

    #[test]
    fn test_v_sign_geometry() {
        let validator = HeuristicValidator::default();

        let v = DetectionResult::empty().with_hand(hand(100.0, 80.0));
        assert!(!validator.validate(&v, TargetPose::VSign, "V sign", 0.9).overridden);

        let flat = DetectionResult::empty().with_hand(hand(90.0, 80.0));
        assert!(validator.validate(&flat, TargetPose::VSign, "V sign", 0.9).is_rejection());

        // One qualifying hand is enough
        let mixed = DetectionResult::empty()
            .with_hand(hand(90.0, 80.0))
            .with_hand(hand(100.0, 40.0));
        assert!(!validator.validate(&mixed, TargetPose::VSign, "V sign", 0.9).overridden);

        assert!(validator
            .validate(&DetectionResult::empty(), TargetPose::VSign, "V sign", 0.9)
            .is_rejection());
    }

    #[test]
    fn test_background_passes_through() {
        let verdict = HeuristicValidator::default().validate(
            &DetectionResult::empty(),
            TargetPose::Background,
            "Background",
            0.4,
        );
        assert_eq!(verdict, Verdict::keep("Background", 0.4));
    }

    proptest! {
        #[test]
        fn prop_passing_confidence_in_band(raw in 0.0f64..=1.0, closed in any::<bool>()) {
            let frame = if closed { eyes(10.0, 2.0) } else { eyes(10.0, 10.0) };
            let verdict =
                HeuristicValidator::default().validate(&frame, TargetPose::Wink, "Wink", raw);
            let points = verdict.points.unwrap();
            if points >= 80.0 {
                prop_assert!(verdict.confidence >= 0.8 && verdict.confidence <= 1.0);
            } else {
                prop_assert_eq!(verdict.confidence, 0.0);
            }
        }
    }
}
