//! Classification, token ranking and local explanations
//!
//! This module provides:
//! - The black-box `Classifier` seam and a linear TF-IDF implementation
//! - Frequency-based token importance
//! - Perturbation sampling and weighted ridge surrogates for explanations
//! - The `TriageService` facade used by the HTTP layer

pub mod classifier;
pub mod explainer;
pub mod features;
pub mod models;
pub mod sampler;
pub mod service;
pub mod surrogate;

pub use classifier::{Classifier, LinearTextClassifier, ModelArtifact};
pub use explainer::Explainer;
pub use features::TokenImportanceRanker;
pub use models::{
    Document, Explanation, ImportanceEntry, Perturbation, ProbabilityVector, SurrogateModel,
};
pub use sampler::PerturbationSampler;
pub use service::{ExplainResult, PredictionResult, TriageService};
pub use surrogate::SurrogateFitter;
