//! Shared fixtures for integration tests
//!
//! Fake classifiers with known behaviour, a store that fails on demand, and
//! helpers for reading Prometheus exposition output.

#![allow(dead_code)]

use async_trait::async_trait;
use issue_triage::config::Config;
use issue_triage::error::{AppError, Result};
use issue_triage::metrics::InMemorySink;
use issue_triage::ml::{Classifier, LinearTextClassifier, ProbabilityVector, TriageService};
use issue_triage::models::{IssueInput, PredictionRecord};
use issue_triage::state::{InMemoryStore, PredictionStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// The issue used throughout the end-to-end checks
pub fn crash_report() -> IssueInput {
    IssueInput::new("App crashes on click", "Steps to reproduce: click submit")
}

pub fn feature_request() -> IssueInput {
    IssueInput::new(
        "Dark mode option",
        "It would be great to add a dark mode setting",
    )
}

/// Default configuration with a fixed seed and in-memory state
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.explainer = config.explainer.with_seed(7);
    config.state.backend = issue_triage::config::StateBackend::Memory;
    config.state.path = None;
    config
}

/// p(bug) is 0.9 while "crash" or "crashes" is present, else 0.2.
///
/// Counts calls and documents so batching can be asserted.
#[derive(Default)]
pub struct KeywordClassifier {
    pub calls: AtomicUsize,
    pub documents: AtomicUsize,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn bug_probability(document: &str) -> f64 {
        if document
            .split_whitespace()
            .any(|t| t == "crash" || t == "crashes")
        {
            0.9
        } else {
            0.2
        }
    }
}

impl Classifier for KeywordClassifier {
    fn predict(&self, documents: &[String]) -> Result<Vec<String>> {
        Ok(self
            .predict_proba(documents)?
            .iter()
            .map(|pv| pv.top().0.to_string())
            .collect())
    }

    fn predict_proba(&self, documents: &[String]) -> Result<Vec<ProbabilityVector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.fetch_add(documents.len(), Ordering::SeqCst);

        documents
            .iter()
            .map(|doc| {
                let bug = Self::bug_probability(doc);
                ProbabilityVector::from_pairs(vec![
                    ("bug", bug),
                    ("enhancement", (1.0 - bug) / 2.0),
                    ("question", (1.0 - bug) / 2.0),
                ])
            })
            .collect()
    }
}

/// Oracle that always fails
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict(&self, _documents: &[String]) -> Result<Vec<String>> {
        Err(AppError::Classifier("model backend unavailable".to_string()))
    }

    fn predict_proba(&self, _documents: &[String]) -> Result<Vec<ProbabilityVector>> {
        Err(AppError::Classifier("model backend unavailable".to_string()))
    }
}

/// In-memory store whose writes can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_updates: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PredictionStore for FlakyStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        self.inner.save_prediction(record).await
    }

    async fn get_prediction(&self, id: &Uuid) -> Result<Option<PredictionRecord>> {
        self.inner.get_prediction(id).await
    }

    async fn update_prediction(&self, record: &PredictionRecord) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("disk full".to_string()));
        }
        self.inner.update_prediction(record).await
    }

    async fn list_predictions(&self, page: u32, page_size: u32) -> Result<Vec<PredictionRecord>> {
        self.inner.list_predictions(page, page_size).await
    }

    async fn count_predictions(&self) -> Result<u64> {
        self.inner.count_predictions().await
    }
}

/// Service over the embedded model and an in-memory store
pub fn embedded_service() -> (Arc<TriageService>, Arc<InMemorySink>) {
    let sink = Arc::new(InMemorySink::new());
    let classifier = Arc::new(LinearTextClassifier::embedded().expect("embedded model"));
    let service = TriageService::new(
        test_config(),
        classifier,
        Arc::new(InMemoryStore::new()),
        sink.clone(),
    );
    (Arc::new(service), sink)
}

/// Extract metric value from a Prometheus output line
/// Example: `metric_name{label1="value1"} 42.5` -> Some(42.5)
pub fn extract_metric_value(line: &str) -> Option<f64> {
    line.split_whitespace().last()?.parse::<f64>().ok()
}

/// First sample line of `metric_name` carrying every `label="value"` given
pub fn find_sample<'a>(output: &'a str, metric_name: &str, labels: &[(&str, &str)]) -> Option<&'a str> {
    output.lines().find(|line| {
        !line.starts_with('#')
            && line.starts_with(metric_name)
            && line[metric_name.len()..].starts_with(['{', ' '])
            && labels
                .iter()
                .all(|(k, v)| line.contains(&format!("{}=\"{}\"", k, v)))
    })
}

/// Check if a metric exists in Prometheus output
pub fn metric_exists(output: &str, metric_name: &str) -> bool {
    output.lines().any(|line| {
        line.starts_with(&format!("# TYPE {} ", metric_name)) || line.starts_with(metric_name)
    })
}
