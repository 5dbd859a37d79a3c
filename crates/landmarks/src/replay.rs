//! Replay detector for recorded detection streams
//!
//! Reads one JSON `DetectionResult` per line and serves them frame by frame.

use crate::{DetectionResult, Detector, DetectorError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where replayed frames come from
#[derive(Debug, Clone)]
enum ReplaySource {
    File(PathBuf),
    Frames(Vec<DetectionResult>),
}

/// Detector that replays recorded detections
pub struct ReplayDetector {
    source: ReplaySource,
    frames: Vec<DetectionResult>,
    cursor: usize,
    looping: bool,
    initialized: bool,
    disposed: bool,
    frames_served: u64,
}

impl ReplayDetector {
    /// Replay a JSON-lines recording from disk (loaded on `initialize`)
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_source(ReplaySource::File(path.into()))
    }

    /// Replay frames already in memory
    pub fn from_frames(frames: Vec<DetectionResult>) -> Self {
        Self::with_source(ReplaySource::Frames(frames))
    }

    fn with_source(source: ReplaySource) -> Self {
        Self {
            source,
            frames: Vec::new(),
            cursor: 0,
            looping: false,
            initialized: false,
            disposed: false,
            frames_served: 0,
        }
    }

    /// Restart from the first frame once the recording is exhausted
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Parse a JSON-lines recording. Blank lines are ignored.
    pub fn parse_lines(content: &str) -> Result<Vec<DetectionResult>, DetectorError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| DetectorError::Parse {
                    line: idx + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Number of frames handed out so far
    pub fn frames_served(&self) -> u64 {
        self.frames_served
    }

    /// Whether `dispose` has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    async fn initialize(&mut self) -> Result<(), DetectorError> {
        self.frames = match &self.source {
            ReplaySource::File(path) => {
                info!("Loading detection recording from {}", path.display());
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| DetectorError::Init(format!("{}: {}", path.display(), e)))?;
                Self::parse_lines(&content).map_err(|e| DetectorError::Init(e.to_string()))?
            }
            ReplaySource::Frames(frames) => frames.clone(),
        };

        if self.frames.is_empty() {
            warn!("Detection recording is empty; every frame will be blank");
        }

        info!("Replay detector ready with {} frames", self.frames.len());
        self.cursor = 0;
        self.initialized = true;
        self.disposed = false;
        Ok(())
    }

    async fn detect(&mut self) -> Result<DetectionResult, DetectorError> {
        if !self.initialized || self.disposed {
            return Err(DetectorError::NotInitialized);
        }

        if self.cursor >= self.frames.len() {
            if self.looping && !self.frames.is_empty() {
                debug!("Replay wrapped after {} frames", self.frames.len());
                self.cursor = 0;
            } else {
                self.frames_served += 1;
                return Ok(DetectionResult::empty());
            }
        }

        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        self.frames_served += 1;
        Ok(frame)
    }

    async fn dispose(&mut self) {
        if !self.disposed {
            info!("Disposing replay detector");
        }
        self.disposed = true;
        self.initialized = false;
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}
