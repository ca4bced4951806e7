//! Criterion benchmarks for the explanation pipeline
//!
//! Measures perturbation sampling, the ridge surrogate fit and a full
//! explanation over the embedded model at a few sample counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use issue_triage::config::ExplainerConfig;
use issue_triage::metrics::InMemorySink;
use issue_triage::ml::{
    Classifier, Document, Explainer, LinearTextClassifier, PerturbationSampler, SurrogateFitter,
};
use issue_triage::text::{Normalizer, TextNormalizer};
use std::sync::Arc;

const ISSUE: &str = "App crashes on click when the settings page is opened twice \
    Steps to reproduce: open settings, close the dialog, open settings again and click save";

fn document() -> Document {
    let tokens = TextNormalizer::new().normalize(ISSUE);
    Document::new(ISSUE, tokens)
}

fn bench_sampling(c: &mut Criterion) {
    let sampler = PerturbationSampler::new(0.75);
    let document = document();
    let mut group = c.benchmark_group("sampling");

    for n_samples in [100usize, 1000, 5000] {
        group.throughput(Throughput::Elements(n_samples as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_samples),
            &n_samples,
            |b, &n| {
                b.iter(|| sampler.sample(black_box(&document.tokens), n, Some(42)));
            },
        );
    }

    group.finish();
}

fn bench_surrogate_fit(c: &mut Criterion) {
    let classifier = LinearTextClassifier::embedded().expect("embedded model");
    let sampler = PerturbationSampler::new(0.75);
    let fitter = SurrogateFitter::new(1.0);
    let document = document();

    let features = PerturbationSampler::features(&document.tokens);
    let perturbations = sampler.sample(&document.tokens, 1000, Some(42));
    let texts: Vec<String> = perturbations
        .iter()
        .map(|p| PerturbationSampler::reassemble(&document.tokens, &features, &p.mask))
        .collect();
    let scored: Vec<_> = classifier
        .predict_proba(&texts)
        .expect("scoring")
        .into_iter()
        .zip(perturbations)
        .map(|(probabilities, p)| p.with_probabilities(probabilities))
        .collect();
    let target = scored[0]
        .probabilities
        .as_ref()
        .map(|pv| pv.top().0.to_string())
        .expect("baseline scored");

    c.bench_function("surrogate_fit_1000", |b| {
        b.iter(|| fitter.fit(black_box(&scored), &features, &target));
    });
}

fn bench_explain(c: &mut Criterion) {
    let classifier = LinearTextClassifier::embedded().expect("embedded model");
    let document = document();
    let mut group = c.benchmark_group("explain");
    group.sample_size(20);

    for n_samples in [500usize, 2000, 5000] {
        let config = ExplainerConfig::default()
            .with_seed(42)
            .with_num_samples(n_samples);
        let explainer = Explainer::new(&config, Arc::new(InMemorySink::new()));

        group.bench_with_input(
            BenchmarkId::from_parameter(n_samples),
            &n_samples,
            |b, _| {
                b.iter(|| explainer.explain(black_box(&document), &classifier, 10));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_sampling, bench_surrogate_fit, bench_explain);
criterion_main!(benches);
