//! Primary store used when no document database is configured

use anyhow::{Result, bail};
use serde_json::Value;

use super::traits::DocumentStore;

/// A document store that is never reachable
///
/// Every request falls through to the local record file.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineDocumentStore;

impl DocumentStore for OfflineDocumentStore {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn ping(&self) -> Result<()> {
        bail!("no primary document store configured")
    }

    fn find_all(&self, _collection: &str) -> Result<Vec<Value>> {
        self.ping().map(|_| Vec::new())
    }

    fn find_by_id(&self, _collection: &str, _id: &str) -> Result<Option<Value>> {
        self.ping().map(|_| None)
    }

    fn insert(&self, _collection: &str, _document: Value) -> Result<String> {
        self.ping().map(|_| String::new())
    }

    fn delete(&self, _collection: &str, _id: &str) -> Result<bool> {
        self.ping().map(|_| false)
    }
}
