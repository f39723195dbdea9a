//! Local record file used as the secondary store
//!
//! Holds one entity type as a flat JSON array. The whole collection is kept
//! in memory and the file is rewritten wholesale after every mutation.
//!
//! ```text
//! ./
//!   local-blogs.json    # [ { "_id": "1717171717171", "title": ... }, ... ]
//!   local-emails.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

use crate::models::{Record, RecordId};

struct Inner<R> {
    records: Vec<R>,
    /// Last id handed out, used to keep local ids strictly increasing
    last_id: i64,
}

/// In-memory record collection mirrored to a JSON file
pub struct LocalRecordFile<R> {
    /// None keeps the collection in memory only
    path: Option<PathBuf>,
    inner: Mutex<Inner<R>>,
}

impl<R: Record> LocalRecordFile<R> {
    /// Open the record file at `path`
    ///
    /// When the file is missing or unreadable the collection starts from
    /// `seed` instead. An unreadable file is moved aside to `<name>.corrupt`
    /// so the next write doesn't destroy it.
    pub fn open(path: impl AsRef<Path>, seed: Vec<R>) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match Self::read(&path) {
            Ok(Some(records)) => {
                info!("Loaded {} records from {}", records.len(), path.display());
                records
            }
            Ok(None) => seed,
            Err(e) => {
                warn!("Ignoring unreadable record file {}: {:#}", path.display(), e);
                Self::set_aside(&path);
                seed
            }
        };

        Self::with_records(Some(path), records)
    }

    /// Keep records in memory only (nothing is written to disk)
    pub fn in_memory(seed: Vec<R>) -> Self {
        Self::with_records(None, seed)
    }

    fn with_records(path: Option<PathBuf>, records: Vec<R>) -> Self {
        let last_id = records
            .iter()
            .filter_map(|r| r.id().as_str().parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        Self {
            path,
            inner: Mutex::new(Inner { records, last_id }),
        }
    }

    fn read(path: &Path) -> Result<Option<Vec<R>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(records))
    }

    fn set_aside(path: &Path) {
        let mut aside = path.as_os_str().to_owned();
        aside.push(".corrupt");
        let aside = PathBuf::from(aside);

        match fs::rename(path, &aside) {
            Ok(()) => warn!("Moved {} to {}", path.display(), aside.display()),
            Err(e) => warn!("Failed to move {} aside: {}", path.display(), e),
        }
    }

    /// Path of the backing file, if persistence is enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of every record, in insertion order
    pub fn all(&self) -> Vec<R> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<R> {
        let inner = self.inner.lock().unwrap();
        inner.records.iter().find(|r| r.id().as_str() == id).cloned()
    }

    /// Assign a local id to `record`, append it and persist the collection
    ///
    /// Ids are derived from the current time in milliseconds and bumped when
    /// two inserts land in the same millisecond. A persistence failure is
    /// logged; the record stays in memory either way.
    pub fn insert(&self, mut record: R) -> RecordId {
        let mut inner = self.inner.lock().unwrap();

        let id = Utc::now().timestamp_millis().max(inner.last_id + 1);
        inner.last_id = id;

        let id = RecordId::new(id.to_string());
        record.set_id(id.clone());
        inner.records.push(record);

        self.persist_logged(&inner.records);
        id
    }

    /// Remove a record by id and persist the collection
    pub fn remove(&self, id: &str) -> Option<R> {
        let mut inner = self.inner.lock().unwrap();
        let index = inner.records.iter().position(|r| r.id().as_str() == id)?;
        let removed = inner.records.remove(index);

        self.persist_logged(&inner.records);
        Some(removed)
    }

    /// Write the current collection to disk
    pub fn save(&self) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        self.persist(&inner.records)
    }

    fn persist_logged(&self, records: &[R]) {
        if let Err(e) = self.persist(records) {
            warn!("Failed to save local records: {:#}", e);
        }
    }

    fn persist(&self, records: &[R]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(records)?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        info!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}
