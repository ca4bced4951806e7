use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Timestamp layout used in correction responses
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Issue report as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueInput {
    #[validate(length(max = 1000))]
    pub title: String,

    #[validate(length(max = 65536))]
    pub body: String,
}

impl IssueInput {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Title and body joined into the text that gets classified
    pub fn text(&self) -> String {
        format!("{} {}", self.title.trim(), self.body.trim())
    }
}

/// Lifecycle of a prediction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionState {
    /// Classified, awaiting feedback
    Predicted,
    /// At least one correction received
    Corrected,
}

/// A stored prediction and the feedback it has received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Unique identifier
    pub id: Uuid,

    pub title: String,
    pub body: String,

    /// Combined text that was classified
    pub text: String,

    pub predicted_label: String,

    /// Maximum class probability at prediction time
    pub confidence: f64,

    pub corrected_label: Option<String>,

    /// Whether the correction confirmed the prediction
    pub is_correct: Option<bool>,

    /// When the prediction was made; fixes the listing order
    pub created_at: DateTime<Utc>,

    /// Creation time, replaced by the time of the latest correction
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(input: &IssueInput, predicted_label: impl Into<String>, confidence: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            body: input.body.clone(),
            text: input.text(),
            predicted_label: predicted_label.into(),
            confidence,
            corrected_label: None,
            is_correct: None,
            created_at: now,
            timestamp: now,
        }
    }

    pub fn state(&self) -> PredictionState {
        if self.corrected_label.is_some() {
            PredictionState::Corrected
        } else {
            PredictionState::Predicted
        }
    }

    /// Apply a correction; the label comparison is exact and case-sensitive.
    ///
    /// Returns whether the prediction was right. Re-applying overwrites the
    /// previous correction.
    pub fn apply_correction(&mut self, corrected_label: impl Into<String>) -> bool {
        let corrected_label = corrected_label.into();
        let is_correct = corrected_label == self.predicted_label;
        self.corrected_label = Some(corrected_label);
        self.is_correct = Some(is_correct);
        self.timestamp = Utc::now();
        is_correct
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
