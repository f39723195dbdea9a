//! Shared shape of everything the reconciliation layer stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::ValidationError;

/// Identifier of a stored record
///
/// Generated by whichever store persisted the record. An empty id means the
/// record has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document that can live in either the primary store or the local file
///
/// Records serialize with their id under `_id` so the same JSON shape is
/// used by the document stores, the local file and the HTTP API.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name in the primary store
    const COLLECTION: &'static str;

    fn id(&self) -> &RecordId;

    fn set_id(&mut self, id: RecordId);

    fn created_at(&self) -> DateTime<Utc>;

    /// Check required fields before the record reaches any store
    fn validate(&self) -> Result<(), ValidationError>;

    /// References to binary assets owned by this record
    fn asset_refs(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Creation time given to documents stored without one
///
/// Fixed so that such documents keep their place across reads.
pub fn unknown_created_at() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Sort records newest first, breaking ties by id so ordering is stable
pub fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}
