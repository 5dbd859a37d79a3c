//! Target poses and their per-pose policy table

use crate::FeatureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Poses the classifier knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPose {
    #[serde(rename = "Wink")]
    Wink,
    #[serde(rename = "V sign")]
    VSign,
    #[serde(rename = "Close up")]
    CloseUp,
    #[serde(rename = "Surprise")]
    Surprise,
    /// Neutral scene; only used when collecting reference samples
    #[serde(rename = "Background")]
    Background,
}

/// Which landmark groups feed the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkGroups {
    pub body: bool,
    pub face: bool,
    pub hand: bool,
}

/// Derived scalars appended after the coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxiliarySignals {
    None,
    /// Left/right eye aspect ratio, then left/right closed flags
    EyeState,
    /// Number of detected body landmarks
    BodyLandmarkCount,
}

/// How classifier output and local geometry are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionPolicy {
    /// 100-point score from geometry plus classifier; pass mark decides
    CompositeScore,
    /// Classifier output kept unless geometry contradicts it
    Veto,
    /// Classifier output used as-is
    Passthrough,
}

impl TargetPose {
    /// Every pose, in training label order
    pub const ALL: [TargetPose; 5] = [
        TargetPose::Wink,
        TargetPose::VSign,
        TargetPose::CloseUp,
        TargetPose::Surprise,
        TargetPose::Background,
    ];

    /// Default challenge order
    pub const CHALLENGE: [TargetPose; 4] = [
        TargetPose::Wink,
        TargetPose::VSign,
        TargetPose::CloseUp,
        TargetPose::Surprise,
    ];

    /// Label used by the classifier
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPose::Wink => "Wink",
            TargetPose::VSign => "V sign",
            TargetPose::CloseUp => "Close up",
            TargetPose::Surprise => "Surprise",
            TargetPose::Background => "Background",
        }
    }

    /// Whether a classifier label names this pose
    pub fn matches_label(&self, label: &str) -> bool {
        self.as_str() == label
    }

    pub fn landmark_groups(&self) -> LandmarkGroups {
        match self {
            TargetPose::Wink | TargetPose::CloseUp => LandmarkGroups {
                body: false,
                face: true,
                hand: false,
            },
            TargetPose::VSign => LandmarkGroups {
                body: false,
                face: false,
                hand: true,
            },
            TargetPose::Surprise => LandmarkGroups {
                body: true,
                face: true,
                hand: false,
            },
            TargetPose::Background => LandmarkGroups {
                body: true,
                face: true,
                hand: true,
            },
        }
    }

    pub fn auxiliary_signals(&self) -> AuxiliarySignals {
        match self {
            TargetPose::Wink => AuxiliarySignals::EyeState,
            TargetPose::CloseUp => AuxiliarySignals::BodyLandmarkCount,
            _ => AuxiliarySignals::None,
        }
    }

    pub fn fusion_policy(&self) -> FusionPolicy {
        match self {
            TargetPose::Wink | TargetPose::Surprise => FusionPolicy::CompositeScore,
            TargetPose::CloseUp | TargetPose::VSign => FusionPolicy::Veto,
            TargetPose::Background => FusionPolicy::Passthrough,
        }
    }

    /// Whether the pose can be asked for in a challenge
    pub fn is_challenge_pose(&self) -> bool {
        !matches!(self, TargetPose::Background)
    }
}

impl fmt::Display for TargetPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPose {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetPose::ALL
            .into_iter()
            .find(|pose| pose.matches_label(s))
            .ok_or_else(|| FeatureError::UnknownPose(s.to_string()))
    }
}
