//! Challenge configuration and layered loading

use crate::ChallengeError;
use feature_engine::TargetPose;
use pose_classifier::ClassifierConfig;
use pose_heuristics::HeuristicConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable prefix, e.g. `POSE_BOOTH__CHALLENGE__PAUSE_SECS`
pub const ENV_PREFIX: &str = "POSE_BOOTH";

/// Capture session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Target poses, in order
    pub poses: Vec<TargetPose>,

    /// Photos to collect
    pub photo_quota: usize,

    /// Consecutive matching frames before the countdown starts
    pub required_stable_frames: u32,

    /// Minimum fused confidence for a matching frame
    pub confidence_threshold: f64,

    /// Pre-capture countdown length (ticks)
    pub countdown_secs: u32,

    /// Inter-pose preparation window (ticks)
    pub pause_secs: u32,

    /// Countdown / pause tick period
    pub tick_ms: u64,

    /// Delay between "Click" and the shutter
    pub capture_delay_ms: u64,

    /// Flash indicator duration
    pub flash_ms: u64,

    /// Delay before handing the photos downstream
    pub handoff_delay_ms: u64,

    /// Frame loop period
    pub frame_interval_ms: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            poses: TargetPose::CHALLENGE.to_vec(),
            photo_quota: 4,
            required_stable_frames: 5,
            confidence_threshold: 0.67,
            countdown_secs: 3,
            pause_secs: 3,
            tick_ms: 1000,
            capture_delay_ms: 400,
            flash_ms: 150,
            handoff_delay_ms: 800,
            frame_interval_ms: 16,
        }
    }
}

impl ChallengeConfig {
    /// More frames at higher confidence
    pub fn strict() -> Self {
        Self {
            required_stable_frames: 8,
            confidence_threshold: 0.8,
            ..Default::default()
        }
    }

    /// Fewer frames at lower confidence
    pub fn lenient() -> Self {
        Self {
            required_stable_frames: 3,
            confidence_threshold: 0.55,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ChallengeError> {
        if self.photo_quota == 0 {
            return Err(ChallengeError::Config("photo_quota must be positive".into()));
        }
        if self.required_stable_frames == 0 {
            return Err(ChallengeError::Config(
                "required_stable_frames must be positive".into(),
            ));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(ChallengeError::Config(format!(
                "confidence_threshold {} outside (0, 1]",
                self.confidence_threshold
            )));
        }
        if self.tick_ms == 0 || self.frame_interval_ms == 0 {
            return Err(ChallengeError::Config("timer periods must be positive".into()));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Offline replay settings for the `pose-challenge-replay` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// JSON-lines file of detection results
    pub detections: PathBuf,
    /// Restart from the first frame when exhausted
    pub looping: bool,
    /// Max log level
    pub log_level: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            detections: PathBuf::from("detections.jsonl"),
            looping: true,
            log_level: "info".to_string(),
        }
    }
}

/// Everything a challenge run needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoothConfig {
    pub challenge: ChallengeConfig,
    pub heuristics: HeuristicConfig,
    pub classifier: ClassifierConfig,
    pub replay: ReplayConfig,
}

impl BoothConfig {
    /// Defaults, then the optional file, then `POSE_BOOTH__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ChallengeError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("challenge.poses"),
        );

        let loaded: BoothConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ChallengeError::Config(e.to_string()))?;

        loaded.challenge.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChallengeConfig::default();
        assert_eq!(config.poses, TargetPose::CHALLENGE.to_vec());
        assert_eq!(config.photo_quota, 4);
        assert_eq!(config.required_stable_frames, 5);
        assert_eq!(config.confidence_threshold, 0.67);
        assert_eq!(config.tick(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(ChallengeConfig::strict().required_stable_frames > 5);
        assert!(ChallengeConfig::lenient().confidence_threshold < 0.67);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_frames = ChallengeConfig {
            required_stable_frames: 0,
            ..Default::default()
        };
        assert!(matches!(zero_frames.validate(), Err(ChallengeError::Config(_))));

        let bad_threshold = ChallengeConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("pose-booth-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[challenge]\n\
             poses = [\"Surprise\", \"Wink\", \"V sign\", \"Close up\"]\n\
             pause_secs = 1\n\
             [classifier]\n\
             base_url = \"http://10.0.0.2:9000\"\n",
        )
        .unwrap();

        let config = BoothConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.challenge.poses[0], TargetPose::Surprise);
        assert_eq!(config.challenge.pause_secs, 1);
        assert_eq!(config.challenge.countdown_secs, 3);
        assert_eq!(config.classifier.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.classifier.timeout_ms, 2000);
        assert_eq!(config.heuristics.pass_mark, 80.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = BoothConfig::load(Some(Path::new("/nonexistent/pose-booth.toml"))).unwrap();
        assert_eq!(config.challenge.photo_quota, 4);
        assert!(config.replay.looping);
    }
}
