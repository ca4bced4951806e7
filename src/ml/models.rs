use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used when checking that probabilities sum to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Class label -> probability for one document.
///
/// Labels are kept in sorted order so that ties in [`ProbabilityVector::top`]
/// resolve deterministically to the lexicographically smallest label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityVector(BTreeMap<String, f64>);

impl ProbabilityVector {
    /// Build a probability vector, rejecting malformed classifier output
    pub fn new(probabilities: BTreeMap<String, f64>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(AppError::Classifier(
                "classifier returned an empty probability vector".to_string(),
            ));
        }

        for (label, p) in &probabilities {
            if !p.is_finite() || *p < -PROBABILITY_TOLERANCE || *p > 1.0 + PROBABILITY_TOLERANCE {
                return Err(AppError::Classifier(format!(
                    "probability {} for class '{}' is outside [0, 1]",
                    p, label
                )));
            }
        }

        let sum: f64 = probabilities.values().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(AppError::Classifier(format!(
                "class probabilities sum to {:.6}, expected 1",
                sum
            )));
        }

        Ok(Self(probabilities))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(l, p)| (l.into(), p)).collect())
    }

    /// Probability of `label`, zero for unknown labels
    pub fn get(&self, label: &str) -> f64 {
        self.0.get(label).copied().unwrap_or(0.0)
    }

    /// Most probable class and its probability
    pub fn top(&self) -> (&str, f64) {
        let mut best: Option<(&str, f64)> = None;
        for (label, &p) in &self.0 {
            if best.map_or(true, |(_, top)| p > top) {
                best = Some((label.as_str(), p));
            }
        }
        // Construction guarantees at least one entry.
        best.unwrap_or(("", 0.0))
    }

    /// Maximum class probability (prediction confidence)
    pub fn confidence(&self) -> f64 {
        self.top().1.clamp(0.0, 1.0)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(l, &p)| (l.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.0
    }
}

/// Raw text plus its normalized token sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub raw: String,
    pub tokens: Vec<String>,
}

impl Document {
    pub fn new(raw: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            raw: raw.into(),
            tokens,
        }
    }

    /// Normalized text as seen by the classifier
    pub fn normalized_text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One masked variant of a document.
///
/// `mask[i]` refers to the i-th distinct token of the document in
/// first-occurrence order; `true` keeps the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub mask: Vec<bool>,

    /// Classifier output for the reassembled text, filled by the caller
    pub probabilities: Option<ProbabilityVector>,

    /// Proximity to the unmasked document, in (0, 1]
    pub weight: f64,
}

impl Perturbation {
    pub fn new(mask: Vec<bool>, weight: f64) -> Self {
        Self {
            mask,
            probabilities: None,
            weight,
        }
    }

    pub fn with_probabilities(mut self, probabilities: ProbabilityVector) -> Self {
        self.probabilities = Some(probabilities);
        self
    }

    pub fn retained(&self) -> usize {
        self.mask.iter().filter(|&&keep| keep).count()
    }

    /// Number of masked positions (Hamming distance to the baseline)
    pub fn masked(&self) -> usize {
        self.mask.len() - self.retained()
    }

    pub fn is_baseline(&self) -> bool {
        self.mask.iter().all(|&keep| keep)
    }
}

/// Signed per-token contributions of a local linear fit.
///
/// Valid only for `target_class` and the document it was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateModel {
    pub target_class: String,

    /// (token, weight) in feature order
    pub weights: Vec<(String, f64)>,

    pub intercept: f64,

    /// Weighted coefficient of determination on the perturbations
    pub score: f64,

    /// Surrogate output for the unmasked document
    pub local_prediction: f64,
}

impl SurrogateModel {
    /// Top `n` tokens by descending absolute weight; ties keep feature order
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let mut ranked = self.weights.clone();
        ranked.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }
}

/// A token and its importance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    pub feature_name: String,
    pub importance_score: f64,
}

impl ImportanceEntry {
    pub fn new(feature_name: impl Into<String>, importance_score: f64) -> Self {
        Self {
            feature_name: feature_name.into(),
            importance_score,
        }
    }
}

/// Local explanation of one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Class the explanation was fit against
    pub label: String,

    /// Classifier probability of `label` for the unmasked document
    pub probability: f64,

    /// (token, weight) sorted by descending absolute weight
    pub features: Vec<(String, f64)>,

    pub intercept: f64,
    pub score: f64,
    pub local_prediction: f64,
}

impl Explanation {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_vector_top_and_confidence() {
        let pv = ProbabilityVector::from_pairs(vec![
            ("bug", 0.7),
            ("enhancement", 0.2),
            ("question", 0.1),
        ])
        .unwrap();

        assert_eq!(pv.top(), ("bug", 0.7));
        assert_eq!(pv.confidence(), 0.7);
        assert_eq!(pv.get("question"), 0.1);
        assert_eq!(pv.get("missing"), 0.0);
        assert_eq!(pv.len(), 3);
    }

    #[test]
    fn test_probability_vector_tie_prefers_sorted_label() {
        let pv = ProbabilityVector::from_pairs(vec![("question", 0.5), ("bug", 0.5)]).unwrap();
        assert_eq!(pv.top().0, "bug");
    }

    #[test]
    fn test_probability_vector_rejects_malformed_output() {
        assert!(ProbabilityVector::from_pairs(vec![("bug", 0.7), ("question", 0.7)]).is_err());
        assert!(ProbabilityVector::from_pairs(vec![("bug", 1.5), ("question", -0.5)]).is_err());
        assert!(ProbabilityVector::from_pairs(vec![("bug", f64::NAN)]).is_err());
        assert!(ProbabilityVector::new(BTreeMap::new()).is_err());
    }

    #[test]
    fn test_perturbation_counts() {
        let p = Perturbation::new(vec![true, false, true, false], 0.5);
        assert_eq!(p.retained(), 2);
        assert_eq!(p.masked(), 2);
        assert!(!p.is_baseline());
        assert!(Perturbation::new(vec![true, true], 1.0).is_baseline());
    }

    #[test]
    fn test_surrogate_top_features_order() {
        let model = SurrogateModel {
            target_class: "bug".to_string(),
            weights: vec![
                ("click".to_string(), 0.1),
                ("crash".to_string(), -0.4),
                ("app".to_string(), 0.4),
                ("submit".to_string(), 0.0),
            ],
            intercept: 0.2,
            score: 0.9,
            local_prediction: 0.3,
        };

        let top = model.top_features(3);
        assert_eq!(top.len(), 3);
        // Equal magnitudes keep feature order.
        assert_eq!(top[0].0, "crash");
        assert_eq!(top[1].0, "app");
        assert_eq!(top[2].0, "click");
    }

    #[test]
    fn test_document_normalized_text() {
        let doc = Document::new(
            "App crashes",
            vec!["app".to_string(), "crashes".to_string()],
        );
        assert_eq!(doc.normalized_text(), "app crashes");
        assert!(!doc.is_empty());
    }
}
