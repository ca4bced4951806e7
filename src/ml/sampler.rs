use crate::ml::models::Perturbation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Generates masked variants of a document.
///
/// The feature space is the document's distinct tokens in first-occurrence
/// order; masking a feature removes every occurrence of that token.
#[derive(Debug, Clone)]
pub struct PerturbationSampler {
    kernel_width: f64,
}

impl PerturbationSampler {
    pub fn new(kernel_width: f64) -> Self {
        Self { kernel_width }
    }

    /// Distinct tokens in first-occurrence order
    pub fn features(tokens: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        tokens
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// Proximity of a mask to the unmasked document.
    ///
    /// `exp(-d² / width²)` with `d` the fraction of masked features, so the
    /// baseline weighs 1 and every other mask weighs strictly less.
    pub fn proximity(&self, masked: usize, n_features: usize) -> f64 {
        if n_features == 0 {
            return 1.0;
        }
        let distance = masked as f64 / n_features as f64;
        (-(distance * distance) / (self.kernel_width * self.kernel_width)).exp()
    }

    /// Draw `n_samples` masks over the distinct tokens of `tokens`.
    ///
    /// The first mask is always the unmasked baseline. Each further mask hides
    /// `k` features chosen uniformly, with `k` uniform in `[1, n_features]`, so
    /// retention ranges over every size from none to all. The same seed yields
    /// the same sequence; no seed draws from OS entropy.
    pub fn sample(
        &self,
        tokens: &[String],
        n_samples: usize,
        rng_seed: Option<u64>,
    ) -> Vec<Perturbation> {
        let n_features = Self::features(tokens).len();
        if n_features == 0 || n_samples == 0 {
            return Vec::new();
        }

        let mut rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut perturbations = Vec::with_capacity(n_samples);
        perturbations.push(Perturbation::new(vec![true; n_features], 1.0));

        for _ in 1..n_samples {
            let n_masked = rng.gen_range(1..=n_features);
            let mut mask = vec![true; n_features];
            for idx in rand::seq::index::sample(&mut rng, n_features, n_masked) {
                mask[idx] = false;
            }
            let weight = self.proximity(n_masked, n_features);
            perturbations.push(Perturbation::new(mask, weight));
        }

        perturbations
    }

    /// Rebuild text from the tokens whose feature is retained
    pub fn reassemble(tokens: &[String], features: &[String], mask: &[bool]) -> String {
        let dropped: HashSet<&str> = features
            .iter()
            .zip(mask.iter())
            .filter(|(_, &keep)| !keep)
            .map(|(f, _)| f.as_str())
            .collect();

        tokens
            .iter()
            .filter(|t| !dropped.contains(t.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
