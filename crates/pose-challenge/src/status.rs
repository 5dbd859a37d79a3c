//! Status lines shown to the user

use feature_engine::TargetPose;
use std::fmt;

/// Human-readable status, rendered via `Display`
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Waiting for the first evaluated frame of a pose
    Prompt { target: TargetPose },
    /// Waiting, with the latest fused result (`None` when nothing was classified)
    Detected {
        target: TargetPose,
        label: Option<String>,
        confidence: f64,
    },
    /// Classifier answered with a non-2xx status
    BackendError { detail: String },
    /// Stable pose, countdown started
    Confirmed { seconds: u32 },
    Click,
    NextPose,
    Complete,
    DetectorFailed { reason: String },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Prompt { target } => write!(f, "Show {}", target),
            Status::Detected {
                target,
                label: Some(label),
                confidence,
            } => write!(
                f,
                "Show {}\nDetected: {} ({}%)",
                target,
                label,
                (confidence * 100.0).round() as i64
            ),
            Status::Detected { target, label: None, .. } => {
                write!(f, "Show {}\nDetected: - (-%)", target)
            }
            Status::BackendError { detail } => {
                write!(f, "Error: {}\nPlease check if the backend is running", detail)
            }
            Status::Confirmed { seconds } => {
                write!(f, "Pose confirmed!\nTaking photo in {} seconds", seconds)
            }
            Status::Click => f.write_str("Click"),
            Status::NextPose => f.write_str("Get ready for the next pose"),
            Status::Complete => f.write_str("Capture Complete"),
            Status::DetectorFailed { reason } => {
                write!(f, "Detector initialization failed: {}", reason)
            }
        }
    }
}
