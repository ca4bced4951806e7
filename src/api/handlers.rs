use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::feedback::{AccuracySnapshot, CorrectionOutcome};
use crate::metrics::gather_metrics;
use crate::ml::{ImportanceEntry, ProbabilityVector};
use crate::models::{IssueInput, PredictionRecord};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Welcome text
pub async fn home() -> &'static str {
    "Welcome to the Issue Triage API! Use the /api/predict endpoint to make predictions."
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        predictions: state.service.count_predictions().await?,
        accuracy: state.service.accuracy(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub predictions: u64,
    pub accuracy: AccuracySnapshot,
}

/// Classify an issue
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResponse>> {
    request.validate()?;

    let input = IssueInput::new(request.title, request.body);
    let result = state.service.predict(&input).await?;

    Ok(Json(PredictionResponse {
        id: result.id,
        predicted_label: result.label,
        confidence: result.confidence,
        probabilities: result.probabilities,
        important_features: result.important_features,
        lime_explanation: result.explanation.map(|e| e.features),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 65536))]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub id: Uuid,
    pub predicted_label: String,
    pub confidence: f64,
    pub probabilities: ProbabilityVector,
    pub important_features: Vec<ImportanceEntry>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lime_explanation: Option<Vec<(String, f64)>>,
}

/// Explain the prediction for an issue
pub async fn explain(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplanationResponse>> {
    request.validate()?;

    let input = IssueInput::new(request.title, request.body);
    let result = state.service.explain(&input, request.num_features).await?;

    Ok(Json(ExplanationResponse {
        input_text: result.input_text,
        predicted_label: result.explanation.label,
        probability: result.explanation.probability,
        explanation: result.explanation.features,
        intercept: result.explanation.intercept,
        score: result.explanation.score,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExplainRequest {
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 65536))]
    pub body: String,
    #[validate(range(min = 1, max = 100))]
    pub num_features: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub input_text: String,
    pub predicted_label: String,
    pub probability: f64,
    pub explanation: Vec<(String, f64)>,
    pub intercept: f64,
    pub score: f64,
}

/// Record a user correction for a stored prediction
pub async fn correct(
    State(state): State<AppState>,
    Json(request): Json<CorrectRequest>,
) -> Result<Json<CorrectionOutcome>> {
    request.validate()?;

    // An id that is not a UUID cannot name a stored prediction.
    let id = Uuid::parse_str(request.id.trim())
        .map_err(|_| AppError::NotFound(format!("Prediction {} not found", request.id)))?;

    let outcome = state.service.correct(id, &request.corrected_label).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CorrectRequest {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub corrected_label: String,
}

/// List stored predictions, newest first
pub async fn view_predictions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PredictionRecord>>> {
    query.validate()?;

    let records = state
        .service
        .list_predictions(query.page, query.page_size)
        .await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    50
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
