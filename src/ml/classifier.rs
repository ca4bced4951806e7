use crate::error::{AppError, Result};
use crate::ml::models::ProbabilityVector;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Frozen text classifier consumed as a black-box oracle.
///
/// Implementations must be side-effect free; the same input always yields the
/// same output and concurrent calls are allowed.
pub trait Classifier: Send + Sync {
    /// Predict class labels, one per document
    fn predict(&self, documents: &[String]) -> Result<Vec<String>>;

    /// Predict class probabilities, one vector per document
    fn predict_proba(&self, documents: &[String]) -> Result<Vec<ProbabilityVector>>;
}

/// Serialized weights of a [`LinearTextClassifier`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Class labels, row order of `coefficients`
    pub labels: Vec<String>,

    /// Term -> column index
    pub vocabulary: HashMap<String, usize>,

    /// Inverse document frequency per column
    pub idf: Vec<f64>,

    /// One row of term weights per class
    pub coefficients: Vec<Vec<f64>>,

    /// One bias per class
    pub intercepts: Vec<f64>,
}

/// Multinomial logistic model over L2-normalised TF-IDF bag-of-words.
///
/// Loaded from a trained artifact; this type never fits weights itself.
#[derive(Debug, Clone)]
pub struct LinearTextClassifier {
    name: String,
    version: String,
    labels: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Array1<f64>,
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
}

impl LinearTextClassifier {
    /// Build a classifier from an artifact, validating its shapes
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let n_classes = artifact.labels.len();
        let n_terms = artifact.idf.len();

        if n_classes < 2 {
            return Err(AppError::Configuration(
                "model artifact needs at least two class labels".to_string(),
            ));
        }
        if artifact.intercepts.len() != n_classes || artifact.coefficients.len() != n_classes {
            return Err(AppError::Configuration(format!(
                "model artifact has {} labels but {} coefficient rows and {} intercepts",
                n_classes,
                artifact.coefficients.len(),
                artifact.intercepts.len()
            )));
        }
        if let Some((term, &idx)) = artifact.vocabulary.iter().find(|(_, &idx)| idx >= n_terms) {
            return Err(AppError::Configuration(format!(
                "vocabulary term '{}' points at column {} but only {} idf values exist",
                term, idx, n_terms
            )));
        }

        let mut coefficients = Array2::zeros((n_classes, n_terms));
        for (row, weights) in artifact.coefficients.iter().enumerate() {
            if weights.len() != n_terms {
                return Err(AppError::Configuration(format!(
                    "coefficient row for '{}' has {} weights, expected {}",
                    artifact.labels[row],
                    weights.len(),
                    n_terms
                )));
            }
            for (col, &w) in weights.iter().enumerate() {
                coefficients[[row, col]] = w;
            }
        }

        Ok(Self {
            name: artifact.name,
            version: artifact.version,
            labels: artifact.labels,
            vocabulary: artifact.vocabulary,
            idf: Array1::from_vec(artifact.idf),
            coefficients,
            intercepts: Array1::from_vec(artifact.intercepts),
        })
    }

    /// Load a JSON artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        let classifier = Self::from_artifact(artifact)?;

        tracing::info!(
            path = %path.display(),
            model = %classifier.name,
            version = %classifier.version,
            classes = classifier.labels.len(),
            terms = classifier.vocabulary.len(),
            "Loaded classifier model"
        );

        Ok(classifier)
    }

    /// The model artifact embedded at build time
    pub fn embedded() -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(include_str!("../../config/model.json"))?;
        Self::from_artifact(artifact)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// L2-normalised TF-IDF vector of a whitespace-tokenized document
    fn vectorize(&self, document: &str) -> Array1<f64> {
        let mut features = Array1::zeros(self.idf.len());
        for term in document.split_whitespace() {
            if let Some(&idx) = self.vocabulary.get(term) {
                features[idx] += 1.0;
            }
        }
        features *= &self.idf;

        let norm = features.dot(&features).sqrt();
        if norm > 0.0 {
            features /= norm;
        }
        features
    }

    fn softmax(logits: &Array1<f64>) -> Array1<f64> {
        let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let exp = logits.mapv(|v| (v - max).exp());
        let sum = exp.sum();
        exp / sum
    }

    fn scores(&self, document: &str) -> Array1<f64> {
        let logits = self.coefficients.dot(&self.vectorize(document)) + &self.intercepts;
        Self::softmax(&logits)
    }
}

impl Classifier for LinearTextClassifier {
    fn predict(&self, documents: &[String]) -> Result<Vec<String>> {
        documents
            .iter()
            .map(|doc| {
                let proba = self.scores(doc);
                // First maximum wins, matching label order.
                let mut best = 0;
                for (idx, &p) in proba.iter().enumerate() {
                    if p > proba[best] {
                        best = idx;
                    }
                }
                Ok(self.labels[best].clone())
            })
            .collect()
    }

    fn predict_proba(&self, documents: &[String]) -> Result<Vec<ProbabilityVector>> {
        documents
            .iter()
            .map(|doc| {
                let proba = self.scores(doc);
                let pairs: BTreeMap<String, f64> = self
                    .labels
                    .iter()
                    .cloned()
                    .zip(proba.iter().copied())
                    .collect();
                ProbabilityVector::new(pairs)
            })
            .collect()
    }
}
