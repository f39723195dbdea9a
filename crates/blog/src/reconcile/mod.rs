//! Storage reconciliation layer
//!
//! Every read and write goes to the primary document store first. When the
//! primary fails the operation is served from the local record file instead,
//! so callers never see store outages:
//!
//! - `list` returns primary records followed by local-only records
//!   (see [`merge_records`]), or just the local records on failure
//! - `get` checks the primary, then the local file
//! - `create` inserts into the primary, or appends to the local file
//! - `delete` removes from the primary, or from the local file
//!
//! Only validation failures reach the caller as errors.

mod health;
mod merge;

pub use health::{ConnectionState, StoreHealth};
pub use merge::merge_records;

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::assets::AssetStore;
use crate::error::ValidationError;
use crate::models::{Record, RecordId, sort_newest_first};
use crate::storage::{DocumentStore, ID_FIELD, LocalRecordFile};

/// Which store ended up holding (or having held) a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreLocation {
    Primary,
    Fallback,
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub id: RecordId,
    pub location: StoreLocation,
}

impl CreateOutcome {
    /// True when the primary store was unavailable and the record was saved locally
    pub fn used_fallback(&self) -> bool {
        self.location == StoreLocation::Fallback
    }
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed from the primary store
    Primary,
    /// Removed from the local record file
    Fallback,
    /// Neither store held the id
    NotFound,
}

/// Dual-store access for one record type
pub struct Reconciler<R: Record> {
    primary: Arc<dyn DocumentStore>,
    local: LocalRecordFile<R>,
    assets: Option<Arc<dyn AssetStore>>,
    health: StoreHealth,
}

impl<R: Record> Reconciler<R> {
    /// Create a reconciler over a primary store and a local record file
    pub fn new(primary: Arc<dyn DocumentStore>, local: LocalRecordFile<R>) -> Self {
        Self {
            primary,
            local,
            assets: None,
            health: StoreHealth::new(),
        }
    }

    /// Delete records' assets from `assets` when the records are deleted
    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// State observed on the most recent primary call
    pub fn connection_state(&self) -> ConnectionState {
        self.health.state()
    }

    /// The local record file backing this reconciler
    pub fn local(&self) -> &LocalRecordFile<R> {
        &self.local
    }

    /// Ping the primary store and record the result
    pub fn probe(&self) -> ConnectionState {
        match self.primary.ping() {
            Ok(()) => self.mark_success(),
            Err(e) => self.mark_failure("ping", &e),
        }
        self.health.state()
    }

    /// All records, primary first, never failing
    pub fn list(&self) -> Vec<R> {
        let local = self.local.all();

        match self.primary.find_all(R::COLLECTION) {
            Ok(documents) => {
                self.mark_success();
                let primary = self.decode_all(documents);
                debug!(
                    "Listing {}: {} from {}, {} local",
                    R::COLLECTION,
                    primary.len(),
                    self.primary.name(),
                    local.len()
                );
                merge_records(primary, local)
            }
            Err(e) => {
                self.mark_failure("list", &e);
                let mut local = local;
                sort_newest_first(&mut local);
                info!("Returning {} {} from local storage", local.len(), R::COLLECTION);
                local
            }
        }
    }

    /// Look up a record in the primary store, then the local file
    pub fn get(&self, id: &str) -> Option<R> {
        if id.is_empty() {
            return None;
        }

        match self.primary.find_by_id(R::COLLECTION, id) {
            Ok(Some(document)) => {
                self.mark_success();
                if let Some(record) = self.decode(document) {
                    return Some(record);
                }
            }
            Ok(None) => {
                self.mark_success();
                debug!(
                    "{} {} not in {}, checking local storage",
                    R::COLLECTION,
                    id,
                    self.primary.name()
                );
            }
            Err(e) => self.mark_failure("get", &e),
        }

        self.local.get(id)
    }

    /// Validate and store a new record
    ///
    /// Any id already set on `record` is replaced by the storing store's id.
    pub fn create(&self, record: R) -> Result<CreateOutcome, ValidationError> {
        record.validate()?;

        match self.insert_primary(&record) {
            Ok(id) => {
                self.mark_success();
                info!("Saved {} {} to {}", R::COLLECTION, id, self.primary.name());
                Ok(CreateOutcome {
                    id: RecordId::new(id),
                    location: StoreLocation::Primary,
                })
            }
            Err(e) => {
                self.mark_failure("create", &e);
                let id = self.local.insert(record);
                info!("Saved {} {} to local storage", R::COLLECTION, id);
                Ok(CreateOutcome {
                    id,
                    location: StoreLocation::Fallback,
                })
            }
        }
    }

    /// Delete a record from whichever store holds it
    ///
    /// Safe to repeat: once the record is gone the result is `NotFound`.
    /// Owned assets are removed best effort.
    pub fn delete(&self, id: &str) -> DeleteOutcome {
        if id.is_empty() {
            return DeleteOutcome::NotFound;
        }

        if let Some(record) = self.delete_primary(id) {
            if let Some(record) = record {
                self.cleanup_assets(&record);
            }
            info!("Deleted {} {} from {}", R::COLLECTION, id, self.primary.name());
            return DeleteOutcome::Primary;
        }

        match self.local.remove(id) {
            Some(record) => {
                self.cleanup_assets(&record);
                info!("Deleted {} {} from local storage", R::COLLECTION, id);
                DeleteOutcome::Fallback
            }
            None => {
                debug!("{} {} not found for delete", R::COLLECTION, id);
                DeleteOutcome::NotFound
            }
        }
    }

    fn insert_primary(&self, record: &R) -> anyhow::Result<String> {
        let mut document = serde_json::to_value(record)?;
        if let Some(map) = document.as_object_mut() {
            map.remove(ID_FIELD);
        }
        self.primary.insert(R::COLLECTION, document)
    }

    /// Returns `Some(record)` when the primary deleted the id, where the
    /// inner value is the decoded record if it could be read first
    fn delete_primary(&self, id: &str) -> Option<Option<R>> {
        let existing = match self.primary.find_by_id(R::COLLECTION, id) {
            Ok(document) => document.and_then(|d| self.decode(d)),
            Err(e) => {
                self.mark_failure("delete", &e);
                return None;
            }
        };

        match self.primary.delete(R::COLLECTION, id) {
            Ok(true) => {
                self.mark_success();
                Some(existing)
            }
            Ok(false) => {
                self.mark_success();
                None
            }
            Err(e) => {
                self.mark_failure("delete", &e);
                None
            }
        }
    }

    fn cleanup_assets(&self, record: &R) {
        let Some(assets) = &self.assets else {
            return;
        };

        for reference in record.asset_refs() {
            if reference.is_empty() {
                continue;
            }
            if let Err(e) = assets.delete(reference) {
                warn!("Failed to delete asset {}: {:#}", reference, e);
            }
        }
    }

    fn decode(&self, document: Value) -> Option<R> {
        match serde_json::from_value(document) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} document: {}", R::COLLECTION, e);
                None
            }
        }
    }

    fn decode_all(&self, documents: Vec<Value>) -> Vec<R> {
        documents
            .into_iter()
            .filter_map(|d| self.decode(d))
            .collect()
    }

    fn mark_success(&self) {
        if self.health.record_success() != ConnectionState::Connected {
            info!("Primary store {} connected", self.primary.name());
        }
    }

    fn mark_failure(&self, operation: &str, error: &anyhow::Error) {
        let previous = self.health.record_failure();
        if previous != ConnectionState::Disconnected {
            warn!(
                "Primary store {} unavailable during {}: {:#}",
                self.primary.name(),
                operation,
                error
            );
        } else {
            debug!(
                "Primary store {} still unavailable ({}): {:#}",
                self.primary.name(),
                operation,
                error
            );
        }
    }
}
