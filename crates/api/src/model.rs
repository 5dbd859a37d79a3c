//! Pose model fitted from recorded samples
//!
//! One label: per-dimension z-score anomaly check around that pose.
//! Several labels: k-nearest-neighbour vote.
//! Both scale every value by the largest value seen in training.

use pose_classifier::Prediction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Label for inputs outside the single trained pose
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Fewer usable samples than this and no model is built
pub const MIN_SAMPLES: usize = 3;

/// Std-dev used for constant dimensions
const STD_FLOOR: f64 = 0.001;

/// Confidence lost at the edge of the anomaly band
const ANOMALY_CONFIDENCE_SPAN: f64 = 0.3;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read training data: {0}")]
    Io(String),
    #[error("Malformed training data: {0}")]
    Parse(String),
    #[error("Not enough data. Minimum {MIN_SAMPLES} samples required. (Current: {0} samples)")]
    NotEnoughSamples(usize),
    #[error("All feature values are zero. Invalid training data.")]
    AllZero,
    #[error("Feature length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Empty feature vector")]
    EmptyFeatures,
}

/// Recorded samples, label -> feature vectors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingSet {
    samples: BTreeMap<String, Vec<Vec<f64>>>,
}

impl TrainingSet {
    pub fn new(samples: BTreeMap<String, Vec<Vec<f64>>>) -> Self {
        Self { samples }
    }

    /// Read the data file; a missing file is an empty set
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            warn!("Training data {} not found, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Io(format!("{}: {}", path.display(), e)))?;
        let set: TrainingSet =
            serde_json::from_str(&content).map_err(|e| ModelError::Parse(e.to_string()))?;
        info!(
            "Loaded {} samples across {} poses from {}",
            set.total(),
            set.samples.len(),
            path.display()
        );
        Ok(set)
    }

    pub fn count(&self, label: &str) -> usize {
        self.samples.get(label).map(Vec::len).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    /// Samples matching the length of the first non-empty sample
    fn usable(&self) -> (Vec<Vec<f64>>, Vec<String>) {
        let mut expected = None;
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (label, vectors) in &self.samples {
            for features in vectors.iter().filter(|f| !f.is_empty()) {
                let len = *expected.get_or_insert(features.len());
                if features.len() != len {
                    warn!(
                        "Skipping {} sample with length {} (expected {})",
                        label,
                        features.len(),
                        len
                    );
                    continue;
                }
                rows.push(features.clone());
                labels.push(label.clone());
            }
        }
        (rows, labels)
    }
}

/// Fitting parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub neighbors: usize,
    pub anomaly_threshold: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            neighbors: 3,
            anomaly_threshold: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyModel {
    pub label: String,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub struct KnnModel {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    pub neighbors: usize,
}

#[derive(Debug, Clone)]
pub enum Classifier {
    Anomaly(AnomalyModel),
    Knn(KnnModel),
}

/// Fitted model plus the training scale
#[derive(Debug, Clone)]
pub struct PoseModel {
    classifier: Classifier,
    scale: f64,
    feature_len: usize,
    samples: usize,
}

impl PoseModel {
    pub fn fit(set: &TrainingSet, params: ModelParams) -> Result<Self, ModelError> {
        let (mut rows, labels) = set.usable();
        if rows.len() < MIN_SAMPLES {
            return Err(ModelError::NotEnoughSamples(rows.len()));
        }

        let scale = rows
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if scale == 0.0 || !scale.is_finite() {
            return Err(ModelError::AllZero);
        }
        for row in rows.iter_mut() {
            row.iter_mut().for_each(|v| *v /= scale);
        }

        let feature_len = rows[0].len();
        let samples = rows.len();
        let mut distinct: Vec<&String> = labels.iter().collect();
        distinct.sort();
        distinct.dedup();

        let classifier = if distinct.len() == 1 {
            let label = labels[0].clone();
            let (mean, std) = column_stats(&rows);
            info!("Anomaly model for {} from {} samples", label, samples);
            Classifier::Anomaly(AnomalyModel {
                label,
                mean,
                std,
                threshold: params.anomaly_threshold,
            })
        } else {
            info!(
                "k-NN model (k={}) from {} samples, {} poses",
                params.neighbors,
                samples,
                distinct.len()
            );
            Classifier::Knn(KnnModel {
                rows,
                labels,
                neighbors: params.neighbors.max(1),
            })
        };

        Ok(Self {
            classifier,
            scale,
            feature_len,
            samples,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn kind(&self) -> &'static str {
        match self.classifier {
            Classifier::Anomaly(_) => "anomaly",
            Classifier::Knn(_) => "knn",
        }
    }

    pub fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyFeatures);
        }
        if features.len() != self.feature_len {
            return Err(ModelError::LengthMismatch {
                expected: self.feature_len,
                actual: features.len(),
            });
        }

        let input: Vec<f64> = features.iter().map(|v| v / self.scale).collect();
        Ok(match &self.classifier {
            Classifier::Anomaly(model) => model.predict(&input),
            Classifier::Knn(model) => model.predict(&input),
        })
    }
}

impl AnomalyModel {
    fn predict(&self, input: &[f64]) -> Prediction {
        let max_z = input
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (mean, std))| ((x - mean) / std).abs())
            .fold(0.0, f64::max);

        if max_z <= self.threshold {
            let confidence =
                (1.0 - (max_z / self.threshold) * ANOMALY_CONFIDENCE_SPAN).clamp(0.0, 1.0);
            Prediction::new(self.label.clone(), confidence)
        } else {
            Prediction::new(UNKNOWN_LABEL, 0.0)
        }
    }
}

impl KnnModel {
    fn predict(&self, input: &[f64]) -> Prediction {
        let mut ranked: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (euclidean(row, input), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let k = self.neighbors.min(ranked.len());
        // (label, votes, rank of nearest member)
        let mut tally: Vec<(&str, usize, usize)> = Vec::new();
        for (rank, (_, i)) in ranked.iter().take(k).enumerate() {
            let label = self.labels[*i].as_str();
            match tally.iter_mut().find(|(l, _, _)| *l == label) {
                Some(entry) => entry.1 += 1,
                None => tally.push((label, 1, rank)),
            }
        }

        match tally
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        {
            Some((label, votes, _)) => Prediction::new(label, votes as f64 / k as f64),
            None => Prediction::new(UNKNOWN_LABEL, 0.0),
        }
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Per-column mean and population std-dev (floored)
fn column_stats(rows: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len() as f64;
    let width = rows.first().map(Vec::len).unwrap_or(0);

    let mut mean = vec![0.0; width];
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut std = vec![0.0; width];
    for row in rows {
        for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
            *s += (v - m) * (v - m);
        }
    }
    for s in std.iter_mut() {
        *s = (*s / n).sqrt();
        if *s == 0.0 {
            *s = STD_FLOOR;
        }
    }

    (mean, std)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(entries: &[(&str, Vec<Vec<f64>>)]) -> TrainingSet {
        TrainingSet::new(
            entries
                .iter()
                .map(|(label, rows)| (label.to_string(), rows.clone()))
                .collect(),
        )
    }

    fn two_pose_set() -> TrainingSet {
        set(&[
            ("V sign", vec![vec![10.0, 10.0], vec![11.0, 10.0], vec![10.0, 11.0]]),
            ("Wink", vec![vec![90.0, 90.0], vec![100.0, 90.0], vec![90.0, 100.0]]),
        ])
    }

    #[test]
    fn test_knn_majority_vote() {
        let model = PoseModel::fit(&two_pose_set(), ModelParams::default()).unwrap();
        assert_eq!(model.kind(), "knn");
        assert_eq!(model.samples(), 6);

        let near_v = model.predict(&[12.0, 12.0]).unwrap();
        assert_eq!(near_v, Prediction::new("V sign", 1.0));

        let near_wink = model.predict(&[95.0, 95.0]).unwrap();
        assert_eq!(near_wink.label, "Wink");
    }

    #[test]
    fn test_knn_partial_vote_confidence() {
        let training = set(&[
            ("Close up", vec![vec![0.0, 1.0], vec![0.0, 2.0]]),
            ("Surprise", vec![vec![0.0, 10.0], vec![0.0, 11.0]]),
        ]);
        let model = PoseModel::fit(&training, ModelParams::default()).unwrap();

        // Two Close up neighbours, one Surprise
        let prediction = model.predict(&[0.0, 4.0]).unwrap();
        assert_eq!(prediction.label, "Close up");
        assert!((prediction.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_knn_tie_goes_to_nearest() {
        let training = set(&[
            ("Background", vec![vec![0.0, 1.0], vec![0.0, 10.0]]),
            ("Wink", vec![vec![0.0, 5.0], vec![0.0, 20.0]]),
        ]);
        let params = ModelParams {
            neighbors: 2,
            ..Default::default()
        };
        let model = PoseModel::fit(&training, params).unwrap();

        let prediction = model.predict(&[0.0, 6.0]).unwrap();
        assert_eq!(prediction.label, "Wink");
        assert_eq!(prediction.confidence, 0.5);
    }

    #[test]
    fn test_anomaly_model() {
        let training = set(&[(
            "Wink",
            vec![vec![10.0, 20.0], vec![12.0, 20.0], vec![14.0, 20.0]],
        )]);
        let model = PoseModel::fit(&training, ModelParams::default()).unwrap();
        assert_eq!(model.kind(), "anomaly");

        // Exactly the mean: full confidence
        let centre = model.predict(&[12.0, 20.0]).unwrap();
        assert_eq!(centre.label, "Wink");
        assert!((centre.confidence - 1.0).abs() < 1e-9);

        // Constant dimension drifts: far outside the floored std
        let off = model.predict(&[12.0, 21.0]).unwrap();
        assert_eq!(off, Prediction::new(UNKNOWN_LABEL, 0.0));
    }

    #[test]
    fn test_anomaly_confidence_band() {
        let training = set(&[("V sign", vec![vec![1.0, 5.0], vec![3.0, 5.0], vec![2.0, 5.0]])]);
        let model = PoseModel::fit(&training, ModelParams::default()).unwrap();
        let Classifier::Anomaly(inner) = model.classifier() else {
            panic!("expected anomaly model");
        };
        // std of [0.2, 0.6, 0.4] is sqrt(2/75); one std off the mean -> z = 1
        let one_std = (inner.mean[0] + inner.std[0]) * 5.0;
        let prediction = model.predict(&[one_std, 5.0]).unwrap();
        assert_eq!(prediction.label, "V sign");
        assert!((prediction.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_fit_rejections() {
        let small = set(&[("Wink", vec![vec![1.0], vec![2.0]])]);
        assert!(matches!(
            PoseModel::fit(&small, ModelParams::default()),
            Err(ModelError::NotEnoughSamples(2))
        ));

        let zeros = set(&[("Wink", vec![vec![0.0, 0.0]; 3])]);
        assert!(matches!(
            PoseModel::fit(&zeros, ModelParams::default()),
            Err(ModelError::AllZero)
        ));
    }

    #[test]
    fn test_mismatched_lengths_skipped() {
        let training = set(&[
            ("Close up", vec![vec![1.0, 1.0], vec![1.0, 1.0, 1.0]]),
            ("Wink", vec![vec![5.0, 5.0], vec![], vec![6.0, 6.0]]),
        ]);
        let model = PoseModel::fit(&training, ModelParams::default()).unwrap();
        assert_eq!(model.samples(), 3);
        assert_eq!(model.feature_len(), 2);

        assert!(matches!(
            model.predict(&[1.0, 2.0, 3.0]),
            Err(ModelError::LengthMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(model.predict(&[]), Err(ModelError::EmptyFeatures)));
    }

    #[test]
    fn test_load_missing_and_present_file() {
        let missing = std::env::temp_dir().join(format!("pose-data-{}.json", uuid::Uuid::new_v4()));
        assert_eq!(TrainingSet::load(&missing).unwrap().total(), 0);

        std::fs::write(&missing, r#"{"Wink": [[1, 2], [3, 4]], "V sign": [[5, 6]]}"#).unwrap();
        let loaded = TrainingSet::load(&missing).unwrap();
        std::fs::remove_file(&missing).ok();

        assert_eq!(loaded.count("Wink"), 2);
        assert_eq!(loaded.count("V sign"), 1);
        assert_eq!(loaded.count("Surprise"), 0);
        assert_eq!(loaded.total(), 3);
    }

    proptest! {
        #[test]
        fn prop_knn_confidence_is_vote_share(x in 0.0f64..100.0, y in 0.0f64..100.0) {
            let model = PoseModel::fit(&two_pose_set(), ModelParams::default()).unwrap();
            let prediction = model.predict(&[x, y]).unwrap();
            let shares = [1.0 / 3.0, 2.0 / 3.0, 1.0];
            prop_assert!(shares.iter().any(|s| (prediction.confidence - s).abs() < 1e-9));
            prop_assert!(prediction.confidence > 0.5);
        }
    }
}
