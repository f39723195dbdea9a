//! In-memory document store
//!
//! Used for tests and local development. An availability switch lets tests
//! simulate the primary store going down.

use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::traits::{DocumentStore, ID_FIELD};

/// In-memory implementation of DocumentStore
///
/// Collections are BTreeMaps keyed by id, protected by a RwLock.
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    available: AtomicBool,
    /// Number of calls made against the store, reachable or not
    operations: AtomicUsize,
}

impl InMemoryDocumentStore {
    /// Create a new empty, reachable store
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            operations: AtomicUsize::new(0),
        }
    }

    /// Simulate the store becoming reachable or unreachable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Total number of operations attempted against this store
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Insert a document under a fixed id, bypassing id generation
    pub fn insert_with_id(&self, collection: &str, id: &str, mut document: Value) {
        if let Some(map) = document.as_object_mut() {
            map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }
        let mut collections = self.collections.write().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Count documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().unwrap();
        collections.get(collection).map_or(0, BTreeMap::len)
    }

    fn check(&self) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            bail!("in-memory document store is unavailable");
        }
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> Result<()> {
        self.check()
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        self.check()?;
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.check()?;
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).and_then(|docs| docs.get(id).cloned()))
    }

    fn insert(&self, collection: &str, document: Value) -> Result<String> {
        self.check()?;
        if !document.is_object() {
            bail!("documents must be JSON objects");
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.insert_with_id(collection, &id, document);
        Ok(id)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.check()?;
        let mut collections = self.collections.write().unwrap();
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }
}
