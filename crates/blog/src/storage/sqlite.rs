//! SQLite-backed document store
//!
//! Embedded alternative to a remote document database. Documents are kept as
//! JSON text alongside their collection, id and creation time.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};
use serde_json::Value;

use super::traits::{DocumentStore, ID_FIELD};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );

        CREATE INDEX idx_documents_created_at
            ON documents(collection, created_at DESC);
        "#,
    )])
}

/// SQLite-based document storage
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) a document database at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn, true)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn, false)
    }

    fn from_connection(mut conn: Connection, wal: bool) -> Result<Self> {
        // WAL lets readers proceed while a request is writing
        if wal {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                "#,
            )?;
        }

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("sqlite connection mutex poisoned"))
    }
}

fn parse_body(body: String) -> Result<Value> {
    serde_json::from_str(&body).context("Failed to parse stored document")
}

impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM documents WHERE collection = ?
             ORDER BY created_at DESC, id ASC",
        )?;

        let bodies = stmt
            .query_map([collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies.into_iter().map(parse_body).collect()
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(parse_body).transpose()
    }

    fn insert(&self, collection: &str, mut document: Value) -> Result<String> {
        let Some(map) = document.as_object_mut() else {
            bail!("documents must be JSON objects");
        };

        let id = uuid::Uuid::new_v4().simple().to_string();
        map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        let created_at = map
            .get("createdAt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let body = serde_json::to_string(&document)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body, created_at) VALUES (?, ?, ?, ?)",
            params![collection, id, body, created_at],
        )?;

        Ok(id)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_migrations_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_insert_find_delete() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let id = store
            .insert("blogs", json!({"title": "A", "createdAt": "2024-01-01T00:00:00Z"}))
            .unwrap();

        let doc = store.find_by_id("blogs", &id).unwrap().unwrap();
        assert_eq!(doc["title"], "A");
        assert_eq!(doc["_id"], id.as_str());

        assert!(store.delete("blogs", &id).unwrap());
        assert!(!store.delete("blogs", &id).unwrap());
        assert!(store.find_by_id("blogs", &id).unwrap().is_none());
    }

    #[test]
    fn test_find_all_newest_first() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store
            .insert("blogs", json!({"title": "old", "createdAt": "2023-01-01T00:00:00Z"}))
            .unwrap();
        store
            .insert("blogs", json!({"title": "new", "createdAt": "2024-01-01T00:00:00Z"}))
            .unwrap();
        store.insert("emails", json!({"email": "a@b.io"})).unwrap();

        let docs = store.find_all("blogs").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["title"], "new");
        assert_eq!(docs[1]["title"], "old");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quill.db");

        let id = {
            let store = SqliteDocumentStore::new(&path).unwrap();
            store.insert("emails", json!({"email": "a@b.io"})).unwrap()
        };

        let store = SqliteDocumentStore::new(&path).unwrap();
        assert!(store.ping().is_ok());
        assert!(store.find_by_id("emails", &id).unwrap().is_some());
    }
}
