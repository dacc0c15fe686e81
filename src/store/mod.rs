//! Record persistence: analysis history and named collections.

pub mod json_file;

pub use json_file::*;

use thiserror::Error;

use crate::pipeline::analysis::CarSpecRecord;

/// Collection every analyzed record is filed under.
pub const DEFAULT_COLLECTION: &str = "Favorites";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Every analyzed record, newest first.
pub trait HistoryRepository: Send + Sync {
    /// Prepend `record`.
    fn append(&self, record: &CarSpecRecord) -> Result<(), StoreError>;
    fn read_all(&self) -> Result<Vec<CarSpecRecord>, StoreError>;
}

/// Named, de-duplicated groups of records.
pub trait CollectionRepository: Send + Sync {
    /// Prepend `record` to collection `name` unless a record with the same
    /// `(carName, brand)` is already there. Returns whether it was inserted.
    fn append_if_absent(&self, name: &str, record: &CarSpecRecord) -> Result<bool, StoreError>;

    /// Records of collection `name`; empty when the collection does not exist.
    fn read_all(&self, name: &str) -> Result<Vec<CarSpecRecord>, StoreError>;
}
