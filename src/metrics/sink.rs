use super::*;
use dashmap::DashMap;

/// Destination for the core's counters, gauges and observations.
///
/// Names are the metric names without namespace (see the `*_COUNTER`,
/// `*_GAUGE` and `*_HISTOGRAM` constants).
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: &str, label: &str);

    fn set_gauge(&self, name: &str, value: f64);

    fn observe(&self, name: &str, value: f64);
}

/// Writes to the global Prometheus registry
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsSink for PrometheusSink {
    fn increment(&self, counter: &str, label: &str) {
        let vec = match counter {
            PREDICTIONS_COUNTER => &*PREDICTIONS_TOTAL,
            CORRECT_PREDICTIONS_COUNTER => &*CORRECT_PREDICTIONS_TOTAL,
            INCORRECT_PREDICTIONS_COUNTER => &*INCORRECT_PREDICTIONS_TOTAL,
            EXPLANATIONS_COUNTER => &*EXPLANATIONS_TOTAL,
            other => {
                tracing::warn!(counter = other, "Unknown counter");
                return;
            }
        };
        vec.with_label_values(&[label]).inc();
    }

    fn set_gauge(&self, name: &str, value: f64) {
        match name {
            MODEL_ACCURACY_GAUGE => MODEL_ACCURACY.set(value),
            other => tracing::warn!(gauge = other, "Unknown gauge"),
        }
    }

    fn observe(&self, name: &str, value: f64) {
        match name {
            PREDICTION_CONFIDENCE_HISTOGRAM => PREDICTION_CONFIDENCE.observe(value),
            EXPLANATION_DURATION_HISTOGRAM => EXPLANATION_DURATION_SECONDS.observe(value),
            other => tracing::warn!(histogram = other, "Unknown histogram"),
        }
    }
}

/// Process-local sink, readable back for assertions and embedding
#[derive(Debug, Default)]
pub struct InMemorySink {
    counters: DashMap<(String, String), u64>,
    gauges: DashMap<String, f64>,
    observations: DashMap<String, Vec<f64>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `counter{label}`, zero when never incremented
    pub fn counter(&self, counter: &str, label: &str) -> u64 {
        self.counters
            .get(&(counter.to_string(), label.to_string()))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of `counter` over all labels
    pub fn counter_total(&self, counter: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().0 == counter)
            .map(|entry| *entry.value())
            .sum()
    }

    /// Last value set, `None` when never set
    pub fn gauge(&self, name: &str) -> Option<f64> {
        self.gauges.get(name).map(|v| *v)
    }

    pub fn observations(&self, name: &str) -> Vec<f64> {
        self.observations
            .get(name)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemorySink {
    fn increment(&self, counter: &str, label: &str) {
        *self
            .counters
            .entry((counter.to_string(), label.to_string()))
            .or_insert(0) += 1;
    }

    fn set_gauge(&self, name: &str, value: f64) {
        self.gauges.insert(name.to_string(), value);
    }

    fn observe(&self, name: &str, value: f64) {
        self.observations
            .entry(name.to_string())
            .or_default()
            .push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_sink_records() {
        let sink = InMemorySink::new();
        sink.increment(PREDICTIONS_COUNTER, "bug");
        sink.increment(PREDICTIONS_COUNTER, "bug");
        sink.increment(PREDICTIONS_COUNTER, "question");
        sink.set_gauge(MODEL_ACCURACY_GAUGE, 0.5);
        sink.observe(PREDICTION_CONFIDENCE_HISTOGRAM, 0.9);

        assert_eq!(sink.counter(PREDICTIONS_COUNTER, "bug"), 2);
        assert_eq!(sink.counter(PREDICTIONS_COUNTER, "enhancement"), 0);
        assert_eq!(sink.counter_total(PREDICTIONS_COUNTER), 3);
        assert_eq!(sink.gauge(MODEL_ACCURACY_GAUGE), Some(0.5));
        assert_eq!(sink.gauge("missing"), None);
        assert_eq!(sink.observations(PREDICTION_CONFIDENCE_HISTOGRAM), vec![0.9]);
    }

    #[test]
    fn test_prometheus_sink_updates_registry() {
        let sink = PrometheusSink::new();
        let before = CORRECT_PREDICTIONS_TOTAL
            .with_label_values(&["enhancement"])
            .get();

        sink.increment(CORRECT_PREDICTIONS_COUNTER, "enhancement");
        sink.set_gauge(MODEL_ACCURACY_GAUGE, 0.75);
        sink.increment("not_a_metric", "x");

        let after = CORRECT_PREDICTIONS_TOTAL
            .with_label_values(&["enhancement"])
            .get();
        assert!(after >= before + 1.0);
    }
}
