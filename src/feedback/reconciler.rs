use crate::error::{AppError, Result};
use crate::feedback::accuracy::AccuracyState;
use crate::metrics::MetricsSink;
use crate::models::PredictionState;
use crate::state::PredictionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of applying one correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub id: Uuid,
    pub corrected_label: String,
    pub is_correct: bool,

    /// `%Y-%m-%d %H:%M:%S`, UTC
    pub timestamp: String,

    /// Accuracy after this correction was counted
    pub accuracy: Option<f64>,
}

/// Moves prediction records from Predicted to Corrected and keeps the
/// accuracy counters in step with what has been persisted.
pub struct CorrectionReconciler {
    store: Arc<dyn PredictionStore>,
    accuracy: Arc<AccuracyState>,
    metrics: Arc<dyn MetricsSink>,
}

impl CorrectionReconciler {
    pub fn new(
        store: Arc<dyn PredictionStore>,
        accuracy: Arc<AccuracyState>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            accuracy,
            metrics,
        }
    }

    pub fn accuracy(&self) -> &AccuracyState {
        &self.accuracy
    }

    /// Record `corrected_label` for prediction `id`.
    ///
    /// The record is persisted before the counters move, so a failed write
    /// leaves accuracy untouched. Correcting a record again counts again.
    pub async fn correct(&self, id: Uuid, corrected_label: &str) -> Result<CorrectionOutcome> {
        if corrected_label.trim().is_empty() {
            return Err(AppError::Validation(
                "corrected_label must not be empty".to_string(),
            ));
        }

        let mut record = self
            .store
            .get_prediction(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Prediction {} not found", id)))?;

        if record.state() == PredictionState::Corrected {
            warn!(
                prediction_id = %id,
                previous = ?record.corrected_label,
                corrected_label,
                "Prediction corrected again; accuracy counters will count it twice"
            );
        }

        let is_correct = record.apply_correction(corrected_label);
        self.store.update_prediction(&record).await?;

        let accuracy = self
            .accuracy
            .record(corrected_label, is_correct, self.metrics.as_ref());

        info!(
            prediction_id = %id,
            predicted_label = %record.predicted_label,
            corrected_label,
            is_correct,
            accuracy = ?accuracy,
            "Correction recorded"
        );

        Ok(CorrectionOutcome {
            id,
            corrected_label: corrected_label.to_string(),
            is_correct,
            timestamp: record.formatted_timestamp(),
            accuracy,
        })
    }
}
