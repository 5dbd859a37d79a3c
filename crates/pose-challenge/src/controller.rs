//! Stability and capture state machine
//!
//! ```text
//! Waiting --5 stable frames--> CountingDown --ticks--> Captured
//!    ^                                                    |
//!    +----------- Paused <-------- next pose -------------+
//!                                                         |
//!                               SequenceComplete <--------+
//! ```

use crate::capture::{CapturedImage, CapturedPhoto};
use crate::config::ChallengeConfig;
use crate::sequence::{Advance, PoseSequence, SequenceDriver};
use crate::ChallengeError;
use feature_engine::TargetPose;
use score_fusion::FusionResult;
use tracing::{debug, info, warn};

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Evaluating frames against the current target
    Waiting,
    /// Countdown running, frames ignored
    CountingDown { remaining: u32 },
    /// Countdown finished, waiting for the shutter
    Captured,
    /// Preparation window before the next target
    Paused { remaining: u32 },
    SequenceComplete,
}

/// What one frame did to the stability counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Not evaluating (countdown, capture, pause or complete)
    Suspended,
    /// Result was for a pose that is no longer the target
    Stale,
    /// Match; counter now at this value
    Progress(u32),
    /// Mismatch or low confidence; counter back to zero
    Reset,
    /// Stability reached; countdown started
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Remaining(u32),
    /// Countdown over, capture now
    Elapsed,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseStep {
    Remaining(u32),
    /// Evaluation resumes for this pose
    Resumed(TargetPose),
    Idle,
}

/// Gates captures on consecutive confident matches
#[derive(Debug, Clone)]
pub struct CaptureController {
    config: ChallengeConfig,
    driver: SequenceDriver,
    phase: Phase,
}

impl CaptureController {
    /// Build from configuration, validating the pose list
    pub fn new(config: ChallengeConfig) -> Result<Self, ChallengeError> {
        config.validate()?;
        let sequence = PoseSequence::new(config.poses.clone(), config.photo_quota)?;
        Ok(Self::with_sequence(config, sequence))
    }

    pub fn with_sequence(config: ChallengeConfig, sequence: PoseSequence) -> Self {
        info!(
            "Capture controller: {} stable frames at >= {:.2}",
            config.required_stable_frames, config.confidence_threshold
        );
        Self {
            config,
            driver: SequenceDriver::new(sequence),
            phase: Phase::Waiting,
        }
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn driver(&self) -> &SequenceDriver {
        &self.driver
    }

    pub fn current_target(&self) -> Option<TargetPose> {
        self.driver.current_target()
    }

    pub fn stable_frames(&self) -> u32 {
        self.driver.state().stable_frame_count
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::SequenceComplete
    }

    /// Whether the next frame should be evaluated
    pub fn accepts_frames(&self) -> bool {
        let state = self.driver.state();
        self.phase == Phase::Waiting && !state.is_capturing && !state.is_paused
    }

    /// Feed one fused result evaluated against `pose`
    pub fn observe(&mut self, pose: TargetPose, result: &FusionResult) -> FrameDecision {
        if !self.accepts_frames() {
            return FrameDecision::Suspended;
        }
        if self.current_target() != Some(pose) {
            debug!("Dropping result for {} (target moved on)", pose);
            return FrameDecision::Stale;
        }

        let threshold = self.config.confidence_threshold;
        let required = self.config.required_stable_frames;
        let state = self.driver.state_mut();

        if !result.matches(pose, threshold) {
            state.stable_frame_count = 0;
            return FrameDecision::Reset;
        }

        state.stable_frame_count += 1;
        if state.stable_frame_count < required {
            return FrameDecision::Progress(state.stable_frame_count);
        }

        state.stable_frame_count = 0;
        state.is_capturing = true;
        self.phase = Phase::CountingDown {
            remaining: self.config.countdown_secs,
        };
        info!("{} stable for {} frames, starting countdown", pose, required);
        FrameDecision::Triggered
    }

    /// One countdown tick
    pub fn countdown_tick(&mut self) -> CountdownStep {
        match self.phase {
            Phase::CountingDown { remaining } if remaining > 1 => {
                self.phase = Phase::CountingDown {
                    remaining: remaining - 1,
                };
                CountdownStep::Remaining(remaining - 1)
            }
            Phase::CountingDown { .. } => {
                self.phase = Phase::Captured;
                CountdownStep::Elapsed
            }
            _ => CountdownStep::Idle,
        }
    }

    /// Store the shutter image and decide what comes next
    pub fn complete_capture(
        &mut self,
        image: CapturedImage,
    ) -> Result<(CapturedPhoto, Advance), ChallengeError> {
        match self.phase {
            Phase::Captured => {}
            Phase::SequenceComplete => return Err(ChallengeError::SequenceComplete),
            other => {
                return Err(ChallengeError::Capture(format!(
                    "no capture pending in {:?}",
                    other
                )))
            }
        }

        let pose = self
            .current_target()
            .ok_or(ChallengeError::SequenceComplete)?;
        let photo = CapturedPhoto::new(pose, self.driver.photos().len(), image);
        self.driver.record_capture(photo.clone())?;

        let advance = self.driver.advance();
        let state = self.driver.state_mut();
        state.is_capturing = false;
        state.stable_frame_count = 0;

        match advance {
            Advance::Next(next) => {
                state.is_paused = true;
                self.phase = Phase::Paused {
                    remaining: self.config.pause_secs,
                };
                info!("Photo {} taken, next pose {}", photo.slot + 1, next);
            }
            Advance::Completed | Advance::AlreadyComplete => {
                self.phase = Phase::SequenceComplete;
            }
        }

        Ok((photo, advance))
    }

    /// Give up on a pending capture and go back to waiting
    pub fn abort_capture(&mut self) {
        if matches!(self.phase, Phase::CountingDown { .. } | Phase::Captured) {
            warn!("Capture aborted for {:?}", self.current_target());
            let state = self.driver.state_mut();
            state.is_capturing = false;
            state.stable_frame_count = 0;
            self.phase = Phase::Waiting;
        }
    }

    /// One pause tick
    pub fn pause_tick(&mut self) -> PauseStep {
        match self.phase {
            Phase::Paused { remaining } if remaining > 1 => {
                self.phase = Phase::Paused {
                    remaining: remaining - 1,
                };
                PauseStep::Remaining(remaining - 1)
            }
            Phase::Paused { .. } => {
                let state = self.driver.state_mut();
                state.is_paused = false;
                state.stable_frame_count = 0;
                self.phase = Phase::Waiting;
                match self.current_target() {
                    Some(pose) => PauseStep::Resumed(pose),
                    None => {
                        self.phase = Phase::SequenceComplete;
                        PauseStep::Idle
                    }
                }
            }
            _ => PauseStep::Idle,
        }
    }

    /// Back to the first pose (session start, detector re-initialization)
    pub fn reset(&mut self) {
        self.driver.reset();
        self.phase = Phase::Waiting;
    }

    /// Captured photos, leaving the controller empty
    pub fn take_photos(&mut self) -> Vec<CapturedPhoto> {
        self.driver.take_photos()
    }
}
