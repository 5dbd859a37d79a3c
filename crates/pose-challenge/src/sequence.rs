//! Target pose sequence and session run state

use crate::capture::CapturedPhoto;
use crate::ChallengeError;
use feature_engine::TargetPose;
use std::collections::HashSet;
use tracing::{debug, info};

/// Ordered, duplicate-free list of challenge poses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseSequence {
    poses: Vec<TargetPose>,
}

impl PoseSequence {
    /// Validate `poses` against the photo quota
    pub fn new(poses: Vec<TargetPose>, quota: usize) -> Result<Self, ChallengeError> {
        if poses.len() != quota {
            return Err(ChallengeError::InvalidSequence(format!(
                "expected {} poses, got {}",
                quota,
                poses.len()
            )));
        }

        let mut seen = HashSet::new();
        for pose in &poses {
            if !pose.is_challenge_pose() {
                return Err(ChallengeError::InvalidSequence(format!(
                    "{} cannot be a challenge pose",
                    pose
                )));
            }
            if !seen.insert(*pose) {
                return Err(ChallengeError::InvalidSequence(format!("duplicate pose {}", pose)));
            }
        }

        Ok(Self { poses })
    }

    pub fn get(&self, index: usize) -> Option<TargetPose> {
        self.poses.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn as_slice(&self) -> &[TargetPose] {
        &self.poses
    }
}

impl Default for PoseSequence {
    fn default() -> Self {
        Self {
            poses: TargetPose::CHALLENGE.to_vec(),
        }
    }
}

/// Mutable state of one challenge attempt
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// `sequence.len()` once the sequence is exhausted
    pub current_target_index: usize,
    /// Append-only during a run
    pub captured_photos: Vec<CapturedPhoto>,
    /// Consecutive matching frames of the current target
    pub stable_frame_count: u32,
    /// Countdown or capture in progress
    pub is_capturing: bool,
    /// Inter-pose preparation window
    pub is_paused: bool,
}

/// Result of [`SequenceDriver::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to this pose
    Next(TargetPose),
    /// Quota filled or last pose done
    Completed,
    /// Already complete, nothing changed
    AlreadyComplete,
}

/// Owns the pose sequence and the session state
#[derive(Debug, Clone)]
pub struct SequenceDriver {
    sequence: PoseSequence,
    state: SessionState,
}

impl SequenceDriver {
    pub fn new(sequence: PoseSequence) -> Self {
        info!("Pose sequence: {:?}", sequence.as_slice());
        Self {
            sequence,
            state: SessionState::default(),
        }
    }

    pub fn sequence(&self) -> &PoseSequence {
        &self.sequence
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Pose being asked for, `None` once exhausted
    pub fn current_target(&self) -> Option<TargetPose> {
        self.sequence.get(self.state.current_target_index)
    }

    pub fn photos(&self) -> &[CapturedPhoto] {
        &self.state.captured_photos
    }

    pub fn is_complete(&self) -> bool {
        self.state.current_target_index >= self.sequence.len()
            || self.state.captured_photos.len() >= self.sequence.len()
    }

    /// Append a photo for the current target
    pub fn record_capture(&mut self, photo: CapturedPhoto) -> Result<(), ChallengeError> {
        if self.is_complete() {
            return Err(ChallengeError::SequenceComplete);
        }
        debug!("Captured {} in slot {}", photo.pose, photo.slot);
        self.state.captured_photos.push(photo);
        Ok(())
    }

    /// Move to the next pose, or finish when the quota is filled or the
    /// last pose was just captured
    pub fn advance(&mut self) -> Advance {
        let len = self.sequence.len();
        if self.state.current_target_index >= len {
            return Advance::AlreadyComplete;
        }

        let at_last = self.state.current_target_index + 1 >= len;
        if self.state.captured_photos.len() >= len || at_last {
            self.state.current_target_index = len;
            info!("Sequence complete with {} photos", self.state.captured_photos.len());
            return Advance::Completed;
        }

        self.state.current_target_index += 1;
        match self.sequence.get(self.state.current_target_index) {
            Some(pose) => Advance::Next(pose),
            None => Advance::Completed,
        }
    }

    /// Back to the first pose with nothing captured
    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    /// Hand the captured photos downstream
    pub fn take_photos(&mut self) -> Vec<CapturedPhoto> {
        std::mem::take(&mut self.state.captured_photos)
    }
}
