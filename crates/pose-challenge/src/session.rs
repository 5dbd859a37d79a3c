//! Challenge runtime
//!
//! One task drives everything: the frame loop, the countdown timer and the
//! pause timer are branches of a single `select!`, so session state has a
//! single writer.

use crate::capture::{CapturedPhoto, FrameCapture};
use crate::controller::{CaptureController, CountdownStep, FrameDecision, PauseStep};
use crate::sequence::Advance;
use crate::status::Status;
use crate::ChallengeError;
use landmarks::{DetectionResult, Detector, DetectorError};
use pose_classifier::{ClassifierError, PoseClassifier};
use score_fusion::{FusionOutcome, FusionResult, ScoreFusion};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Everything the host UI needs to render a challenge
#[derive(Debug, Clone)]
pub enum ChallengeEvent {
    /// Rendered status line
    Status(String),
    /// Pre-capture countdown value
    Countdown(u32),
    /// Flash indicator on/off
    Flash(bool),
    PhotoCaptured(CapturedPhoto),
    /// Inter-pose preparation countdown value
    PauseTick(u32),
    /// Final photos, in sequence order
    Completed(Vec<CapturedPhoto>),
}

/// A pose challenge bound to its collaborators
pub struct ChallengeSession<D, C, F> {
    detector: D,
    fusion: ScoreFusion<C>,
    capture: F,
    controller: CaptureController,
    events: mpsc::Sender<ChallengeEvent>,
    countdown: Option<Interval>,
    pause: Option<Interval>,
}

impl<D, C, F> ChallengeSession<D, C, F>
where
    D: Detector,
    C: PoseClassifier,
    F: FrameCapture,
{
    pub fn new(
        controller: CaptureController,
        detector: D,
        fusion: ScoreFusion<C>,
        capture: F,
        events: mpsc::Sender<ChallengeEvent>,
    ) -> Self {
        Self {
            detector,
            fusion,
            capture,
            controller,
            events,
            countdown: None,
            pause: None,
        }
    }

    /// Run until the sequence completes or `shutdown` flips to `true`.
    ///
    /// The detector is disposed on every exit path. Dropping the shutdown
    /// sender also cancels the run.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<CapturedPhoto>, ChallengeError> {
        info!("Initializing {} detector", self.detector.name());
        if let Err(e) = self.detector.initialize().await {
            let reason = match e {
                DetectorError::Init(reason) => reason,
                other => other.to_string(),
            };
            error!("Detector initialization failed: {}", reason);
            emit_status(
                &self.events,
                Status::DetectorFailed {
                    reason: reason.clone(),
                },
            );
            self.detector.dispose().await;
            return Err(ChallengeError::DetectorInit(reason));
        }

        self.controller.reset();
        let result = self.drive(&mut shutdown).await;

        self.countdown = None;
        self.pause = None;
        self.detector.dispose().await;

        match &result {
            Ok(photos) => info!("Challenge finished with {} photos", photos.len()),
            Err(e) => info!("Challenge stopped: {}", e),
        }
        result
    }

    async fn drive(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Vec<CapturedPhoto>, ChallengeError> {
        let Some(first) = self.controller.current_target() else {
            return Err(ChallengeError::InvalidSequence("empty sequence".into()));
        };
        emit_status(&self.events, Status::Prompt { target: first });

        let mut frames = time::interval(self.controller.config().frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Err(ChallengeError::Cancelled);
                    }
                }
                _ = next_tick(&mut self.countdown), if self.countdown.is_some() => {
                    if let Some(photos) = self.on_countdown_tick().await? {
                        return Ok(photos);
                    }
                }
                _ = next_tick(&mut self.pause), if self.pause.is_some() => {
                    self.on_pause_tick();
                }
                _ = frames.tick() => {
                    self.on_frame().await;
                }
            }
        }
    }

    /// Detect, fuse and feed the controller
    async fn on_frame(&mut self) {
        if !self.controller.accepts_frames() {
            return;
        }
        let Some(target) = self.controller.current_target() else {
            return;
        };

        let outcome = match self.detector.detect().await {
            Ok(detection) => self.fusion.evaluate(&detection, target).await,
            Err(e) => {
                warn!("Detection failed: {}", e);
                self.fusion.evaluate(&DetectionResult::empty(), target).await
            }
        };

        emit_status(&self.events, frame_status(&outcome));

        if self.controller.observe(outcome.pose, &outcome.result) == FrameDecision::Triggered {
            let seconds = self.controller.config().countdown_secs;
            emit_status(&self.events, Status::Confirmed { seconds });
            emit(&self.events, ChallengeEvent::Countdown(seconds));
            self.countdown = Some(ticker(self.controller.config().tick()));
        }
    }

    async fn on_countdown_tick(&mut self) -> Result<Option<Vec<CapturedPhoto>>, ChallengeError> {
        match self.controller.countdown_tick() {
            CountdownStep::Remaining(n) => {
                emit(&self.events, ChallengeEvent::Countdown(n));
                Ok(None)
            }
            CountdownStep::Elapsed => {
                self.countdown = None;
                emit(&self.events, ChallengeEvent::Countdown(0));
                self.shoot().await
            }
            CountdownStep::Idle => {
                self.countdown = None;
                Ok(None)
            }
        }
    }

    /// Shutter, flash, then advance or complete
    async fn shoot(&mut self) -> Result<Option<Vec<CapturedPhoto>>, ChallengeError> {
        let config = self.controller.config().clone();

        emit_status(&self.events, Status::Click);
        time::sleep(config.capture_delay()).await;

        emit(&self.events, ChallengeEvent::Flash(true));
        let image = self.capture.capture().await;
        time::sleep(config.flash()).await;
        emit(&self.events, ChallengeEvent::Flash(false));

        let image = match image {
            Ok(image) => image,
            Err(e) => {
                warn!("Capture failed, waiting for the pose again: {}", e);
                self.controller.abort_capture();
                if let Some(target) = self.controller.current_target() {
                    emit_status(&self.events, Status::Prompt { target });
                }
                return Ok(None);
            }
        };

        let (photo, advance) = self.controller.complete_capture(image)?;
        emit(&self.events, ChallengeEvent::PhotoCaptured(photo));

        match advance {
            Advance::Next(_) => {
                emit_status(&self.events, Status::NextPose);
                emit(&self.events, ChallengeEvent::PauseTick(config.pause_secs));
                self.pause = Some(ticker(config.tick()));
                Ok(None)
            }
            Advance::Completed | Advance::AlreadyComplete => {
                emit_status(&self.events, Status::Complete);
                time::sleep(config.handoff_delay()).await;
                let photos = self.controller.take_photos();
                emit(&self.events, ChallengeEvent::Completed(photos.clone()));
                Ok(Some(photos))
            }
        }
    }

    fn on_pause_tick(&mut self) {
        match self.controller.pause_tick() {
            PauseStep::Remaining(n) => emit(&self.events, ChallengeEvent::PauseTick(n)),
            PauseStep::Resumed(target) => {
                self.pause = None;
                emit(&self.events, ChallengeEvent::PauseTick(0));
                emit_status(&self.events, Status::Prompt { target });
            }
            PauseStep::Idle => self.pause = None,
        }
    }
}

fn emit_status(events: &mpsc::Sender<ChallengeEvent>, status: Status) {
    let line = status.to_string();
    debug!("Status: {:?}", line);
    emit(events, ChallengeEvent::Status(line));
}

/// Never waits on the host: a full channel drops the event, a closed one is ignored
fn emit(events: &mpsc::Sender<ChallengeEvent>, event: ChallengeEvent) {
    if let Err(mpsc::error::TrySendError::Full(event)) = events.try_send(event) {
        debug!("Event channel full, dropping {:?}", event);
    }
}

/// Status line for one evaluated frame
fn frame_status(outcome: &FusionOutcome) -> Status {
    match &outcome.failure {
        Some(ClassifierError::Rejected { detail, .. }) => Status::BackendError {
            detail: detail.clone(),
        },
        _ => {
            let FusionResult {
                predicted_label,
                confidence,
            } = &outcome.result;
            Status::Detected {
                target: outcome.pose,
                label: predicted_label.clone(),
                confidence: *confidence,
            }
        }
    }
}

/// Interval whose first tick is one period away
fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
