//! Recorded sample counts

use crate::AppState;
use axum::{extract::State, Json};
use feature_engine::TargetPose;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `GET /api/pose-counts`: every available pose, zero when unrecorded
pub async fn pose_counts(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, usize>> {
    let counts = TargetPose::ALL
        .iter()
        .map(|pose| (pose.as_str().to_string(), state.training.count(pose.as_str())))
        .collect();
    Json(counts)
}
