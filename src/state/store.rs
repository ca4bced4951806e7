use crate::error::{AppError, Result};
use crate::models::PredictionRecord;
use crate::state::{paginate, sort_newest_first, PredictionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory prediction store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    predictions: Arc<DashMap<Uuid, PredictionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionStore for InMemoryStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        self.predictions.insert(record.id, record.clone());
        tracing::debug!(prediction_id = %record.id, "Prediction saved");
        Ok(())
    }

    async fn get_prediction(&self, id: &Uuid) -> Result<Option<PredictionRecord>> {
        Ok(self.predictions.get(id).map(|entry| entry.clone()))
    }

    async fn update_prediction(&self, record: &PredictionRecord) -> Result<()> {
        match self.predictions.get_mut(&record.id) {
            Some(mut entry) => {
                *entry = record.clone();
                tracing::debug!(prediction_id = %record.id, "Prediction updated");
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Prediction {} not found",
                record.id
            ))),
        }
    }

    async fn list_predictions(&self, page: u32, page_size: u32) -> Result<Vec<PredictionRecord>> {
        let mut records: Vec<PredictionRecord> = self
            .predictions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut records);
        Ok(paginate(records, page, page_size))
    }

    async fn count_predictions(&self) -> Result<u64> {
        Ok(self.predictions.len() as u64)
    }
}
