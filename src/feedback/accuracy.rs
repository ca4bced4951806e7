use crate::metrics::{
    MetricsSink, CORRECT_PREDICTIONS_COUNTER, INCORRECT_PREDICTIONS_COUNTER, MODEL_ACCURACY_GAUGE,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correct / incorrect tallies for one label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub correct: u64,
    pub incorrect: u64,
}

/// Point-in-time copy of the accuracy counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySnapshot {
    pub correct_total: u64,
    pub incorrect_total: u64,

    /// `None` until the first correction
    pub accuracy: Option<f64>,

    /// Keyed by corrected label
    pub per_label: BTreeMap<String, LabelCounts>,
}

#[derive(Debug, Default)]
struct Counters {
    correct_total: u64,
    incorrect_total: u64,
    per_label: BTreeMap<String, LabelCounts>,
}

impl Counters {
    fn accuracy(&self) -> Option<f64> {
        let total = self.correct_total + self.incorrect_total;
        if total == 0 {
            None
        } else {
            Some(self.correct_total as f64 / total as f64)
        }
    }
}

/// Running correction accuracy, shared by every request in the process.
///
/// Starts at zero and only grows. Each correction updates its counters and
/// publishes the recomputed gauge inside a single critical section, so
/// concurrent corrections can neither lose an increment nor publish a stale
/// gauge over a newer one.
#[derive(Debug, Default)]
pub struct AccuracyState {
    counters: Mutex<Counters>,
}

impl AccuracyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one correction for `label` and publish the new gauge.
    ///
    /// Returns the accuracy after the update.
    pub fn record(&self, label: &str, is_correct: bool, sink: &dyn MetricsSink) -> Option<f64> {
        let mut guard = self.counters.lock();
        let counters = &mut *guard;

        let entry = counters.per_label.entry(label.to_string()).or_default();
        if is_correct {
            entry.correct += 1;
            counters.correct_total += 1;
            sink.increment(CORRECT_PREDICTIONS_COUNTER, label);
        } else {
            entry.incorrect += 1;
            counters.incorrect_total += 1;
            sink.increment(INCORRECT_PREDICTIONS_COUNTER, label);
        }

        let accuracy = counters.accuracy();
        if let Some(value) = accuracy {
            sink.set_gauge(MODEL_ACCURACY_GAUGE, value);
        }
        accuracy
    }

    /// Current accuracy, `None` while no corrections have been counted
    pub fn accuracy(&self) -> Option<f64> {
        self.counters.lock().accuracy()
    }

    pub fn snapshot(&self) -> AccuracySnapshot {
        let counters = self.counters.lock();
        AccuracySnapshot {
            correct_total: counters.correct_total,
            incorrect_total: counters.incorrect_total,
            accuracy: counters.accuracy(),
            per_label: counters.per_label.clone(),
        }
    }
}
