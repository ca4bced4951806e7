pub mod factory;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_store, create_store};
pub use sled_store::SledStore;
pub use store::*;

use crate::error::Result;
use crate::models::PredictionRecord;
use async_trait::async_trait;
use uuid::Uuid;

/// Trait for prediction record storage
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Save a new record
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()>;

    /// Get a record by ID
    async fn get_prediction(&self, id: &Uuid) -> Result<Option<PredictionRecord>>;

    /// Overwrite an existing record, `NotFound` when absent
    async fn update_prediction(&self, record: &PredictionRecord) -> Result<()>;

    /// List records, newest first; `page` is zero-based
    async fn list_predictions(&self, page: u32, page_size: u32) -> Result<Vec<PredictionRecord>>;

    /// Number of stored records
    async fn count_predictions(&self) -> Result<u64>;
}

/// Newest prediction first, ties by id so pages are stable.
///
/// Ordered by creation, so corrections do not move records.
pub(crate) fn sort_newest_first(records: &mut [PredictionRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

pub(crate) fn paginate(
    records: Vec<PredictionRecord>,
    page: u32,
    page_size: u32,
) -> Vec<PredictionRecord> {
    let start = page as usize * page_size as usize;
    records
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect()
}
