//! Score Fusion
//!
//! Combines one remote classification with the local heuristics for the
//! current target pose:
//! - empty feature vector: no request, no match
//! - classifier failure: no match, failure kept for the status line
//! - Wink / Surprise: composite score decides label and confidence
//! - Close up / V sign: classifier result unless geometry vetoes it
//! - Background: classifier result as-is

use feature_engine::{FeatureExtractor, FeatureVector, FusionPolicy, TargetPose};
use landmarks::DetectionResult;
use pose_classifier::{ClassifierError, PoseClassifier, Prediction};
use pose_heuristics::{HeuristicValidator, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fused label and confidence for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// `None` when nothing was classified
    pub predicted_label: Option<String>,
    pub confidence: f64,
}

impl FusionResult {
    /// No classification this frame
    pub fn none() -> Self {
        Self {
            predicted_label: None,
            confidence: 0.0,
        }
    }

    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            predicted_label: Some(label.into()),
            confidence: unit(confidence),
        }
    }

    /// Label is `pose` and confidence reaches `threshold`
    pub fn matches(&self, pose: TargetPose, threshold: f64) -> bool {
        self.predicted_label
            .as_deref()
            .is_some_and(|label| pose.matches_label(label))
            && self.confidence >= threshold
    }

    pub fn is_none(&self) -> bool {
        self.predicted_label.is_none()
    }
}

impl From<Prediction> for FusionResult {
    fn from(prediction: Prediction) -> Self {
        Self {
            predicted_label: Some(prediction.label),
            confidence: unit(prediction.confidence),
        }
    }
}

impl From<Verdict> for FusionResult {
    fn from(verdict: Verdict) -> Self {
        Self {
            predicted_label: verdict.label,
            confidence: unit(verdict.confidence),
        }
    }
}

/// Confidence clamped into [0, 1]; NaN counts as no confidence
fn unit(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Everything the fusion step learned about one frame
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    /// Pose the frame was evaluated against
    pub pose: TargetPose,
    pub result: FusionResult,
    /// Raw classifier output, when a request succeeded
    pub raw: Option<Prediction>,
    /// Heuristic verdict, when a rule applied
    pub verdict: Option<Verdict>,
    /// Request failure to surface to the user
    pub failure: Option<ClassifierError>,
}

impl FusionOutcome {
    fn skipped(pose: TargetPose) -> Self {
        Self {
            pose,
            result: FusionResult::none(),
            raw: None,
            verdict: None,
            failure: None,
        }
    }

    /// Whether the classifier was asked at all
    pub fn classified(&self) -> bool {
        self.raw.is_some() || self.failure.is_some()
    }
}

/// Feature extraction, classification and heuristics for one frame
pub struct ScoreFusion<C> {
    classifier: C,
    extractor: FeatureExtractor,
    validator: HeuristicValidator,
}

impl<C: PoseClassifier> ScoreFusion<C> {
    pub fn new(classifier: C, extractor: FeatureExtractor, validator: HeuristicValidator) -> Self {
        Self {
            classifier,
            extractor,
            validator,
        }
    }

    /// Default extractor and heuristics, sharing the validator's eye thresholds
    pub fn with_classifier(classifier: C) -> Self {
        let validator = HeuristicValidator::default();
        let extractor = FeatureExtractor::new(validator.config().eye);
        Self::new(classifier, extractor, validator)
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Extract features for `pose` and fuse them
    pub async fn evaluate(&self, detection: &DetectionResult, pose: TargetPose) -> FusionOutcome {
        let features = self.extractor.extract(detection, pose);
        self.fuse(pose, &features, detection).await
    }

    /// Classify `features` and apply the pose's fusion policy
    pub async fn fuse(
        &self,
        pose: TargetPose,
        features: &FeatureVector,
        detection: &DetectionResult,
    ) -> FusionOutcome {
        if features.is_empty() {
            debug!("[{}] no relevant landmarks, skipping classifier", pose);
            return FusionOutcome::skipped(pose);
        }

        let prediction = match self.classifier.predict(features.as_slice()).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!("[{}] {} classifier failed: {}", pose, self.classifier.name(), e);
                return FusionOutcome {
                    failure: Some(e),
                    ..FusionOutcome::skipped(pose)
                };
            }
        };

        let (result, verdict) = match pose.fusion_policy() {
            FusionPolicy::Passthrough => (FusionResult::from(prediction.clone()), None),
            FusionPolicy::CompositeScore | FusionPolicy::Veto => {
                let verdict = self.validator.validate(
                    detection,
                    pose,
                    &prediction.label,
                    prediction.confidence,
                );
                (FusionResult::from(verdict.clone()), Some(verdict))
            }
        };

        debug!(
            "[{}] raw {} ({:.2}) -> {:?} ({:.2})",
            pose, prediction.label, prediction.confidence, result.predicted_label, result.confidence
        );

        FusionOutcome {
            pose,
            result,
            raw: Some(prediction),
            verdict,
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::geometry::{INDEX_TIP, MIDDLE_TIP, PINKY_TIP, RING_TIP};
    use landmarks::{FaceDetection, HandDetection, Keypoint};
    use pose_classifier::MockClassifier;
    use proptest::prelude::*;

    fn v_hand() -> HandDetection {
        let mut keypoints = vec![Keypoint::xy(0.0, 0.0); 21];
        keypoints[INDEX_TIP] = Keypoint::xy(0.0, 100.0);
        keypoints[MIDDLE_TIP] = Keypoint::xy(0.0, 100.0);
        keypoints[RING_TIP] = Keypoint::xy(0.0, 40.0);
        keypoints[PINKY_TIP] = Keypoint::xy(0.0, 40.0);
        HandDetection::new(keypoints)
    }

    fn flat_hand() -> HandDetection {
        HandDetection::new((0..21).map(|i| Keypoint::xy(0.0, i as f64)).collect())
    }

    #[tokio::test]
    async fn test_empty_vector_skips_classifier() {
        let mock = MockClassifier::always("Wink", 1.0);
        let fusion = ScoreFusion::with_classifier(mock.clone());

        // Hands only: nothing for a face pose
        let frame = DetectionResult::empty().with_hand(v_hand());
        let outcome = fusion.evaluate(&frame, TargetPose::Wink).await;

        assert_eq!(outcome.result, FusionResult::none());
        assert!(!outcome.classified());
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let mock = MockClassifier::failing(ClassifierError::Rejected {
            status: 404,
            detail: "No trained model available".to_string(),
        });
        let fusion = ScoreFusion::with_classifier(mock.clone());

        let frame = DetectionResult::empty().with_hand(v_hand());
        let outcome = fusion.evaluate(&frame, TargetPose::VSign).await;

        assert_eq!(outcome.result, FusionResult::none());
        assert_eq!(
            outcome.failure.map(|e| e.detail()).as_deref(),
            Some("No trained model available")
        );
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_veto_policy() {
        let fusion = ScoreFusion::with_classifier(MockClassifier::always("V sign", 0.9));

        let good = DetectionResult::empty().with_hand(v_hand());
        let outcome = fusion.evaluate(&good, TargetPose::VSign).await;
        assert_eq!(outcome.result, FusionResult::new("V sign", 0.9));
        assert!(outcome.result.matches(TargetPose::VSign, 0.67));

        let bad = DetectionResult::empty().with_hand(flat_hand());
        let outcome = fusion.evaluate(&bad, TargetPose::VSign).await;
        assert_eq!(outcome.result, FusionResult::new("V sign", 0.0));
        assert!(outcome.verdict.is_some_and(|v| v.is_rejection()));
    }

    #[tokio::test]
    async fn test_composite_policy_relabels() {
        let fusion = ScoreFusion::with_classifier(MockClassifier::always("Surprise", 0.3));
        let mut keypoints = vec![Keypoint::Missing; 468];
        keypoints[1] = Keypoint::xy(0.0, 0.0);
        keypoints[152] = Keypoint::xy(0.0, 100.0);
        keypoints[13] = Keypoint::xy(0.0, 50.0);
        keypoints[14] = Keypoint::xy(0.0, 60.0);
        let frame = DetectionResult::empty().with_face(FaceDetection::new(keypoints));

        let outcome = fusion.evaluate(&frame, TargetPose::Surprise).await;
        assert_eq!(outcome.raw, Some(Prediction::new("Surprise", 0.3)));
        assert_eq!(outcome.result.predicted_label.as_deref(), Some("Surprise"));
        assert!((outcome.result.confidence - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_background_passthrough() {
        let fusion = ScoreFusion::with_classifier(MockClassifier::always("Unknown", 0.0));
        let frame = DetectionResult::empty().with_hand(flat_hand());
        let outcome = fusion.evaluate(&frame, TargetPose::Background).await;
        assert_eq!(outcome.result, FusionResult::new("Unknown", 0.0));
        assert!(outcome.verdict.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_clamped() {
        let fusion = ScoreFusion::with_classifier(MockClassifier::always("V sign", 1.5));
        let frame = DetectionResult::empty().with_hand(v_hand());
        let outcome = fusion.evaluate(&frame, TargetPose::VSign).await;
        assert_eq!(outcome.raw, Some(Prediction::new("V sign", 1.5)));
        assert_eq!(outcome.result, FusionResult::new("V sign", 1.0));

        let fusion = ScoreFusion::with_classifier(MockClassifier::always("Background", -0.2));
        let outcome = fusion.evaluate(&frame, TargetPose::Background).await;
        assert_eq!(outcome.result.confidence, 0.0);
        assert_eq!(FusionResult::new("Wink", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_matches_requires_label_and_threshold() {
        assert!(FusionResult::new("Wink", 0.67).matches(TargetPose::Wink, 0.67));
        assert!(!FusionResult::new("Wink", 0.66).matches(TargetPose::Wink, 0.67));
        assert!(!FusionResult::new("Close up", 0.99).matches(TargetPose::Wink, 0.67));
        assert!(!FusionResult::none().matches(TargetPose::Wink, 0.0));
    }

    proptest! {
        #[test]
        fn prop_no_detection_never_classified(pose_idx in 0usize..5) {
            let pose = TargetPose::ALL[pose_idx];
            let mock = MockClassifier::always("Wink", 1.0);
            let fusion = ScoreFusion::with_classifier(mock.clone());
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let outcome = runtime.block_on(fusion.evaluate(&DetectionResult::empty(), pose));
            prop_assert!(outcome.result.is_none());
            prop_assert_eq!(mock.calls(), 0);
        }
    }
}
