//! Storage traits and implementations
//!
//! This module defines the primary document store abstraction and the local
//! record file used as the secondary store. The trait-based design allows
//! swapping between remote, embedded and in-memory primaries.

mod http;
mod local_file;
mod memory;
mod offline;
mod sqlite;
mod traits;

pub use http::HttpDocumentStore;
pub use local_file::LocalRecordFile;
pub use memory::InMemoryDocumentStore;
pub use offline::OfflineDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use traits::{DocumentStore, ID_FIELD, normalize_id};
