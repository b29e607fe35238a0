//! Local record store for waybill.
//!
//! Records are kept on this machine independently of any cloud provider. The
//! [`RecordStore`] trait abstracts the backend; [`FileRecordStore`] keeps one
//! pretty-printed JSON file per code and [`MemoryRecordStore`] keeps records
//! in memory.
//!
//! # Example
//!
//! ```
//! use waybill_storage::{MemoryRecordStore, RecordStore};
//! use waybill_types::TrackingRecord;
//!
//! let store = MemoryRecordStore::new();
//! store.put(&TrackingRecord::new("ab12", "Recife", "Natal")).expect("put");
//! assert!(store.get("AB12").expect("get").is_some());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result, bail};
use waybill_types::{TrackingRecord, normalize_code};

/// File extension for stored records
pub const RECORD_EXTENSION: &str = "json";

/// Backend for locally kept records.
///
/// Codes are normalized by every method, so `ab12` and `AB12` name the same
/// record.
pub trait RecordStore: Send + Sync {
    /// All records, sorted by code
    fn get_all(&self) -> Result<Vec<TrackingRecord>>;

    /// One record by code
    fn get(&self, code: &str) -> Result<Option<TrackingRecord>>;

    /// Insert or replace a record
    fn put(&self, record: &TrackingRecord) -> Result<()>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, code: &str) -> Result<bool>;

    /// Human-readable location of the store
    fn location(&self) -> String;
}

/// Normalize `code` and reject values that cannot name a single file.
pub fn checked_code(code: &str) -> Result<String> {
    let code = normalize_code(code);
    if code.is_empty() {
        bail!("tracking code must not be empty");
    }
    if code.contains(['/', '\\']) || code.contains("..") {
        bail!("tracking code contains a path separator: {code}");
    }
    Ok(code)
}

/// Directory of `<CODE>.json` files.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `code`
    pub fn record_path(&self, code: &str) -> Result<PathBuf> {
        let code = checked_code(code)?;
        Ok(self.dir.join(format!("{code}.{RECORD_EXTENSION}")))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .with_context(|| format!("failed to create store dir: {}", self.dir.display()))?;
        }
        Ok(())
    }

    /// Record files are named by a normalized code, so lowercase side files
    /// such as `settings.json` are never read as records.
    fn is_record_file(path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != RECORD_EXTENSION) {
            return false;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| checked_code(stem).is_ok_and(|code| code == stem))
    }

    fn read_record(path: &Path) -> Result<TrackingRecord> {
        let content = std::fs::read(path)
            .with_context(|| format!("failed to read record: {}", path.display()))?;
        serde_json::from_slice(&content)
            .with_context(|| format!("failed to parse record: {}", path.display()))
    }
}

impl RecordStore for FileRecordStore {
    fn get_all(&self) -> Result<Vec<TrackingRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read store dir: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && Self::is_record_file(&path) {
                records.push(Self::read_record(&path)?);
            }
        }

        records.sort_by_key(TrackingRecord::normalized_code);
        Ok(records)
    }

    fn get(&self, code: &str) -> Result<Option<TrackingRecord>> {
        let path = self.record_path(code)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn put(&self, record: &TrackingRecord) -> Result<()> {
        let path = self.record_path(&record.code)?;
        self.ensure_dir()?;

        let mut record = record.clone();
        record.normalize();
        let content =
            serde_json::to_string_pretty(&record).context("failed to serialize record")?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write record: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to rename record to: {}", path.display()))?;

        Ok(())
    }

    fn delete(&self, code: &str) -> Result<bool> {
        let path = self.record_path(code)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to delete record: {}", path.display()))?;
        Ok(true)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// In-memory store, keyed by normalized code.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, TrackingRecord>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`
    pub fn with_records(records: impl IntoIterator<Item = TrackingRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|mut r| {
                r.normalize();
                (r.code.clone(), r)
            })
            .collect();
        Self {
            records: Mutex::new(map),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, TrackingRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_all(&self) -> Result<Vec<TrackingRecord>> {
        Ok(self.lock().values().cloned().collect())
    }

    fn get(&self, code: &str) -> Result<Option<TrackingRecord>> {
        let code = checked_code(code)?;
        Ok(self.lock().get(&code).cloned())
    }

    fn put(&self, record: &TrackingRecord) -> Result<()> {
        let code = checked_code(&record.code)?;
        let mut record = record.clone();
        record.code = code.clone();
        self.lock().insert(code, record);
        Ok(())
    }

    fn delete(&self, code: &str) -> Result<bool> {
        let code = checked_code(code)?;
        Ok(self.lock().remove(&code).is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
