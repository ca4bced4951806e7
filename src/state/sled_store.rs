use crate::error::{AppError, Result};
use crate::models::PredictionRecord;
use crate::state::{paginate, sort_newest_first, PredictionStore};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent prediction store using Sled embedded database
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    predictions_tree: sled::Tree,
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref).map_err(|e| {
            AppError::Persistence(format!("Failed to open Sled database: {}", e))
        })?;

        let predictions_tree = db.open_tree("predictions").map_err(|e| {
            AppError::Persistence(format!("Failed to open predictions tree: {}", e))
        })?;

        tracing::info!("Initialized Sled store at {:?}", path_ref);

        Ok(Self {
            db: Arc::new(db),
            predictions_tree,
        })
    }

    fn serialize_record(record: &PredictionRecord) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(|e| {
            AppError::Persistence(format!("Failed to serialize prediction: {}", e))
        })
    }

    fn deserialize_record(bytes: &[u8]) -> Result<PredictionRecord> {
        bincode::deserialize(bytes).map_err(|e| {
            AppError::Persistence(format!("Failed to deserialize prediction: {}", e))
        })
    }

    fn record_key(id: &Uuid) -> Vec<u8> {
        id.as_bytes().to_vec()
    }

    fn write(&self, record: &PredictionRecord) -> Result<()> {
        let value = Self::serialize_record(record)?;

        self.predictions_tree
            .insert(Self::record_key(&record.id), value)
            .map_err(|e| AppError::Persistence(format!("Failed to write prediction: {}", e)))?;

        // Corrections must be durable before accuracy counters move.
        self.predictions_tree.flush().map_err(|e| {
            AppError::Persistence(format!("Failed to flush predictions tree: {}", e))
        })?;

        Ok(())
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| {
            AppError::Persistence(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for SledStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        self.write(record)?;
        tracing::debug!(prediction_id = %record.id, "Prediction saved to Sled");
        Ok(())
    }

    async fn get_prediction(&self, id: &Uuid) -> Result<Option<PredictionRecord>> {
        match self.predictions_tree.get(Self::record_key(id)) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_record(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Persistence(format!(
                "Failed to get prediction: {}",
                e
            ))),
        }
    }

    async fn update_prediction(&self, record: &PredictionRecord) -> Result<()> {
        let exists = self
            .predictions_tree
            .contains_key(Self::record_key(&record.id))
            .map_err(|e| {
                AppError::Persistence(format!("Failed to check prediction existence: {}", e))
            })?;

        if !exists {
            return Err(AppError::NotFound(format!(
                "Prediction {} not found",
                record.id
            )));
        }

        self.write(record)?;
        tracing::debug!(prediction_id = %record.id, "Prediction updated in Sled");
        Ok(())
    }

    async fn list_predictions(&self, page: u32, page_size: u32) -> Result<Vec<PredictionRecord>> {
        let mut records = Vec::new();

        for result in self.predictions_tree.iter() {
            let (_, value) = result.map_err(|e| {
                AppError::Persistence(format!("Failed to iterate predictions: {}", e))
            })?;
            records.push(Self::deserialize_record(&value)?);
        }

        sort_newest_first(&mut records);
        Ok(paginate(records, page, page_size))
    }

    async fn count_predictions(&self) -> Result<u64> {
        Ok(self.predictions_tree.len() as u64)
    }
}
