//! Scripted classifier for development and tests

use crate::{ClassifierError, PoseClassifier, Prediction};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Reply = Result<Prediction, ClassifierError>;

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<Reply>,
    fallback: Option<Reply>,
    last_features: Option<Vec<f64>>,
}

/// Replays queued replies, then repeats a fallback reply.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with the same prediction
    pub fn always(label: &str, confidence: f64) -> Self {
        let mock = Self::new();
        mock.script().fallback = Some(Ok(Prediction::new(label, confidence)));
        mock
    }

    /// Always fail with the given error
    pub fn failing(error: ClassifierError) -> Self {
        let mock = Self::new();
        mock.script().fallback = Some(Err(error));
        mock
    }

    pub fn push_prediction(&self, label: &str, confidence: f64) -> &Self {
        self.script()
            .queued
            .push_back(Ok(Prediction::new(label, confidence)));
        self
    }

    pub fn push_error(&self, error: ClassifierError) -> &Self {
        self.script().queued.push_back(Err(error));
        self
    }

    /// Replace the reply used once the queue is drained
    pub fn set_fallback(&self, reply: Reply) {
        self.script().fallback = Some(reply);
    }

    /// Number of `predict` calls, including refused ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_features(&self) -> Option<Vec<f64>> {
        self.script().last_features.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PoseClassifier for MockClassifier {
    async fn predict(&self, features: &[f64]) -> Result<Prediction, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if features.is_empty() {
            return Err(ClassifierError::EmptyFeatures);
        }

        let mut script = self.script();
        script.last_features = Some(features.to_vec());
        let reply = match script.queued.pop_front() {
            Some(reply) => reply,
            None => script.fallback.clone().unwrap_or_else(|| {
                Err(ClassifierError::Transport("No scripted reply".to_string()))
            }),
        };
        debug!("Mock classifier reply: {:?}", reply);
        reply
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
