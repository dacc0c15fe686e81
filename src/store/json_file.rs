//! JSON-file backed stores.
//!
//! Each store owns one file and serializes its read-modify-write cycle
//! behind a mutex. Writes go to a temp file in the same directory and are
//! renamed over the target, so readers never observe a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{CollectionRepository, HistoryRepository, StoreError};
use crate::pipeline::analysis::CarSpecRecord;

type Collections = BTreeMap<String, Vec<CarSpecRecord>>;

// ═══════════════════════════════════════════════════════════
// History
// ═══════════════════════════════════════════════════════════

pub struct JsonHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryRepository for JsonHistoryStore {
    fn append(&self, record: &CarSpecRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut records: Vec<CarSpecRecord> = read_json(&self.path)?;
        records.insert(0, record.clone());
        write_json_atomic(&self.path, &records)?;
        tracing::debug!(total = records.len(), "History updated");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<CarSpecRecord>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        read_json(&self.path)
    }
}

// ═══════════════════════════════════════════════════════════
// Collections
// ═══════════════════════════════════════════════════════════

/// All collections live in one file, keyed by collection name.
pub struct JsonCollectionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonCollectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl CollectionRepository for JsonCollectionStore {
    fn append_if_absent(&self, name: &str, record: &CarSpecRecord) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut collections: Collections = read_json(&self.path)?;
        let entries = collections.entry(name.to_string()).or_default();

        let present = entries
            .iter()
            .any(|r| r.car_name == record.car_name && r.brand == record.brand);
        if present {
            return Ok(false);
        }

        entries.insert(0, record.clone());
        write_json_atomic(&self.path, &collections)?;
        tracing::debug!(collection = name, car = %record.car_name, "Record added to collection");
        Ok(true)
    }

    fn read_all(&self, name: &str) -> Result<Vec<CarSpecRecord>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut collections: Collections = read_json(&self.path)?;
        Ok(collections.remove(name).unwrap_or_default())
    }
}

// ── File helpers ────────────────────────────────────────────

/// Missing or blank files read as the empty value.
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
