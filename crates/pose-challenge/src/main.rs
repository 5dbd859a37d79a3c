//! Pose Challenge Replay - runs a challenge against recorded detections

use anyhow::Context;
use feature_engine::FeatureExtractor;
use landmarks::ReplayDetector;
use pose_challenge::{
    BoothConfig, CaptureController, ChallengeEvent, ChallengeSession, CountingCapture,
};
use pose_classifier::HttpClassifier;
use pose_heuristics::HeuristicValidator;
use score_fusion::ScoreFusion;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pose-booth.toml"));
    let config = BoothConfig::load(Some(&config_path))?;
    init_logging(&config.replay.log_level)?;

    info!("=== Pose Challenge Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let detector =
        ReplayDetector::from_path(config.replay.detections.clone()).looping(config.replay.looping);
    let classifier = HttpClassifier::new(&config.classifier)?;
    let fusion = ScoreFusion::new(
        classifier,
        FeatureExtractor::new(config.heuristics.eye),
        HeuristicValidator::new(config.heuristics.clone()),
    );
    let controller = CaptureController::new(config.challenge.clone())?;

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let session = ChallengeSession::new(
        controller,
        detector,
        fusion,
        CountingCapture::new("replay"),
        event_tx,
    );
    let run = tokio::spawn(session.run(shutdown_rx));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping challenge");
            let _ = shutdown_tx.send(true);
        }
    });

    while let Some(event) = event_rx.recv().await {
        match event {
            ChallengeEvent::Status(line) => info!("{}", line.replace('\n', " | ")),
            ChallengeEvent::Countdown(n) if n > 0 => info!("Countdown {}", n),
            ChallengeEvent::PauseTick(n) if n > 0 => info!("Next pose in {}", n),
            ChallengeEvent::PhotoCaptured(photo) => {
                info!("Photo {} ({}) -> {}", photo.slot + 1, photo.pose, photo.image.as_str())
            }
            ChallengeEvent::Completed(photos) => {
                info!("Handing off {} photos", photos.len())
            }
            _ => {}
        }
    }

    let photos = run.await??;
    for photo in &photos {
        println!("{}\t{}\t{}", photo.slot + 1, photo.pose, photo.captured_at.to_rfc3339());
    }
    Ok(())
}
