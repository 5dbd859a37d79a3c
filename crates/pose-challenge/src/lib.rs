//! Pose Challenge
//!
//! Runs one photo-booth pose challenge:
//! - pull a detection per frame and fuse it into a label and confidence
//! - count consecutive matches of the current target pose
//! - count down, flash and capture once the pose is stable
//! - pause, then move on to the next pose until the quota is filled

pub mod capture;
pub mod config;
pub mod controller;
pub mod sequence;
pub mod session;
pub mod status;

pub use capture::{CapturedImage, CapturedPhoto, CountingCapture, FrameCapture};
pub use config::{BoothConfig, ChallengeConfig, ReplayConfig};
pub use controller::{CaptureController, CountdownStep, FrameDecision, PauseStep, Phase};
pub use sequence::{Advance, PoseSequence, SequenceDriver, SessionState};
pub use session::{ChallengeEvent, ChallengeSession};
pub use status::Status;

use thiserror::Error;

/// Challenge error types
#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("Detector initialization failed: {0}")]
    DetectorInit(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Sequence already complete")]
    SequenceComplete,

    #[error("Invalid pose sequence: {0}")]
    InvalidSequence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Challenge cancelled")]
    Cancelled,
}
