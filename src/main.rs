use issue_triage::{
    api::{build_router, AppState},
    config::Config,
    metrics::{init_metrics, MetricsSink, PrometheusSink},
    ml::{Classifier, LinearTextClassifier, TriageService},
    state::create_store,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "issue_triage={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(e) = config_error {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }
    config.validate()?;

    tracing::info!(
        service = %config.observability.service_name,
        "Starting Issue Triage v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }
    let metrics: Arc<dyn MetricsSink> = Arc::new(PrometheusSink::new());

    // Load the frozen classifier
    let classifier = match &config.classifier.model_path {
        Some(path) => LinearTextClassifier::load(path)?,
        None => {
            tracing::info!("No model_path configured, using the embedded model");
            LinearTextClassifier::embedded()?
        }
    };
    tracing::info!(
        model = %classifier.name(),
        version = %classifier.version(),
        labels = ?classifier.labels(),
        "Classifier ready"
    );
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let store = create_store(&config.state)?;

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let service = Arc::new(TriageService::new(config, classifier, store, metrics));
    let app = build_router(AppState::new(service));

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Metrics: http://{}/metrics", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
