use crate::api::{handlers, AppState};
use crate::metrics::track_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.service.config().server.request_timeout_secs);

    Router::new()
        .route("/", get(handlers::home))
        // Health endpoints
        .route("/health", get(handlers::health_check))
        // Classification
        .route("/api/predict", post(handlers::predict))
        .route("/api/explain", post(handlers::explain))
        // Feedback
        .route("/api/correct", post(handlers::correct))
        .route("/api/view_predictions", get(handlers::view_predictions))
        // Prometheus scrape
        .route("/metrics", get(handlers::metrics))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(middleware::from_fn(track_metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
