use crate::config::ExplainerConfig;
use crate::error::{AppError, Result};
use crate::metrics::{
    MetricsSink, EXPLANATIONS_COUNTER, EXPLANATION_DURATION_HISTOGRAM,
};
use crate::ml::classifier::Classifier;
use crate::ml::models::{Document, Explanation};
use crate::ml::sampler::PerturbationSampler;
use crate::ml::surrogate::SurrogateFitter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Local surrogate explanations for a black-box classifier.
///
/// Holds configuration only. Each call samples fresh perturbations and fits
/// a fresh surrogate that is dropped before returning.
pub struct Explainer {
    sampler: PerturbationSampler,
    fitter: SurrogateFitter,
    num_samples: usize,
    seed: Option<u64>,
    metrics: Arc<dyn MetricsSink>,
}

impl Explainer {
    pub fn new(config: &ExplainerConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            sampler: PerturbationSampler::new(config.kernel_width),
            fitter: SurrogateFitter::new(config.ridge_alpha),
            num_samples: config.num_samples,
            seed: config.seed,
            metrics,
        }
    }

    /// Explain the classifier's top class for `document`.
    ///
    /// Returns at most `num_features` (token, weight) pairs sorted by
    /// descending absolute weight. Classifier failures propagate.
    pub fn explain(
        &self,
        document: &Document,
        classifier: &dyn Classifier,
        num_features: usize,
    ) -> Result<Explanation> {
        let start = Instant::now();
        let result = self.run(document, classifier, num_features);

        self.metrics
            .observe(EXPLANATION_DURATION_HISTOGRAM, start.elapsed().as_secs_f64());
        match &result {
            Ok(explanation) => {
                self.metrics.increment(EXPLANATIONS_COUNTER, "success");
                debug!(
                    label = %explanation.label,
                    features = explanation.features.len(),
                    score = explanation.score,
                    "Explanation computed"
                );
            }
            Err(e) => {
                self.metrics.increment(EXPLANATIONS_COUNTER, "failure");
                warn!(error = %e, "Explanation failed");
            }
        }

        result
    }

    fn run(
        &self,
        document: &Document,
        classifier: &dyn Classifier,
        num_features: usize,
    ) -> Result<Explanation> {
        if document.is_empty() {
            return Err(AppError::Validation(
                "document has no tokens to explain".to_string(),
            ));
        }

        let features = PerturbationSampler::features(&document.tokens);
        let perturbations = self
            .sampler
            .sample(&document.tokens, self.num_samples.max(1), self.seed);

        let texts: Vec<String> = perturbations
            .iter()
            .map(|p| PerturbationSampler::reassemble(&document.tokens, &features, &p.mask))
            .collect();

        // One batched oracle call; row 0 is the unmasked baseline.
        let probabilities = classifier.predict_proba(&texts)?;
        if probabilities.len() != texts.len() {
            return Err(AppError::Classifier(format!(
                "classifier returned {} probability vectors for {} documents",
                probabilities.len(),
                texts.len()
            )));
        }

        let (target_class, probability) = {
            let (label, p) = probabilities[0].top();
            (label.to_string(), p)
        };

        let perturbations: Vec<_> = perturbations
            .into_iter()
            .zip(probabilities)
            .map(|(p, proba)| p.with_probabilities(proba))
            .collect();

        let surrogate = self.fitter.fit(&perturbations, &features, &target_class)?;

        Ok(Explanation {
            label: target_class,
            probability,
            features: surrogate.top_features(num_features),
            intercept: surrogate.intercept,
            score: surrogate.score,
            local_prediction: surrogate.local_prediction,
        })
    }
}
