//! Prometheus metrics for the issue triage service.
//!
//! Covers prediction volume and confidence, correction outcomes and the
//! running accuracy gauge, explanation latency, HTTP traffic and errors.
//!
//! # Example
//! ```no_run
//! use issue_triage::metrics::PREDICTIONS_TOTAL;
//!
//! PREDICTIONS_TOTAL.with_label_values(&["bug"]).inc();
//! ```

mod middleware;
mod sink;

pub use middleware::track_metrics;
pub use sink::{InMemorySink, MetricsSink, PrometheusSink};

use lazy_static::lazy_static;
use prometheus::{CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "issue_triage";

/// Counter: predictions served, by predicted category
pub const PREDICTIONS_COUNTER: &str = "predictions_total";
/// Counter: corrections confirming the prediction, by corrected category
pub const CORRECT_PREDICTIONS_COUNTER: &str = "correct_predictions_total";
/// Counter: corrections overriding the prediction, by corrected category
pub const INCORRECT_PREDICTIONS_COUNTER: &str = "incorrect_predictions_total";
/// Counter: explanation attempts, by outcome
pub const EXPLANATIONS_COUNTER: &str = "explanations_total";
/// Gauge: correct / (correct + incorrect)
pub const MODEL_ACCURACY_GAUGE: &str = "model_accuracy";
/// Histogram: max class probability of each prediction
pub const PREDICTION_CONFIDENCE_HISTOGRAM: &str = "prediction_confidence";
/// Histogram: wall time of one explanation
pub const EXPLANATION_DURATION_HISTOGRAM: &str = "explanation_duration_seconds";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Prediction Metrics
    // ============================================================================

    /// Total number of predictions
    ///
    /// Labels: category
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(PREDICTIONS_COUNTER, "Total number of predictions")
            .namespace(NAMESPACE),
        &["category"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Confidence of each prediction
    pub static ref PREDICTION_CONFIDENCE: Histogram = Histogram::with_opts(
        HistogramOpts::new(PREDICTION_CONFIDENCE_HISTOGRAM, "Confidence of predictions")
            .namespace(NAMESPACE)
            .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99, 1.0])
    ).expect("Failed to create PREDICTION_CONFIDENCE metric");

    // ============================================================================
    // Feedback Metrics
    // ============================================================================

    /// Corrections that confirmed the predicted label
    ///
    /// Labels: category
    pub static ref CORRECT_PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(CORRECT_PREDICTIONS_COUNTER, "Total number of correct predictions")
            .namespace(NAMESPACE),
        &["category"]
    ).expect("Failed to create CORRECT_PREDICTIONS_TOTAL metric");

    /// Corrections that overrode the predicted label
    ///
    /// Labels: category
    pub static ref INCORRECT_PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(INCORRECT_PREDICTIONS_COUNTER, "Total number of incorrect predictions")
            .namespace(NAMESPACE),
        &["category"]
    ).expect("Failed to create INCORRECT_PREDICTIONS_TOTAL metric");

    /// Running accuracy over all corrections
    pub static ref MODEL_ACCURACY: Gauge = Gauge::with_opts(
        Opts::new(MODEL_ACCURACY_GAUGE, "Accuracy of the model")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_ACCURACY metric");

    // ============================================================================
    // Explanation Metrics
    // ============================================================================

    /// Total number of explanations
    ///
    /// Labels: status (success, failure)
    pub static ref EXPLANATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(EXPLANATIONS_COUNTER, "Total number of explanations")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create EXPLANATIONS_TOTAL metric");

    /// Explanation duration in seconds
    pub static ref EXPLANATION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(EXPLANATION_DURATION_HISTOGRAM, "Explanation duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("Failed to create EXPLANATION_DURATION_SECONDS metric");

    // ============================================================================
    // Error Metrics
    // ============================================================================

    /// Total number of errors
    ///
    /// Labels: component, error_type
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("errors_total", "Total number of errors")
            .namespace(NAMESPACE),
        &["component", "error_type"]
    ).expect("Failed to create ERRORS_TOTAL metric");

    /// Build information
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry.
///
/// Call once at startup; a second call fails with `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PREDICTION_CONFIDENCE.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(CORRECT_PREDICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INCORRECT_PREDICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(MODEL_ACCURACY.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(EXPLANATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(EXPLANATION_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(ERRORS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
