//! Blog crate - Business logic for the Quill publishing backend
//!
//! This crate provides platform-independent blog functionality including:
//! - Domain models (Post, Subscriber, Category)
//! - Document store abstractions with HTTP, SQLite and in-memory backends
//! - A local record file used when the primary store is unreachable
//! - The reconciliation layer that merges primary and local records
//! - Asset storage for uploaded images
//! - Identity provider integration for admin sessions
//!
//! Everything here is synchronous so it can be driven from any executor.

pub mod assets;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod samples;
pub mod site;
pub mod storage;

pub use assets::{AssetStore, FileAssetStore, InlineAssetStore};
pub use auth::{
    AuthError, AuthService, FirebaseIdentityProvider, IdentityProvider, InMemoryIdentityProvider,
    ObserverId, Session, SessionEvent,
};
pub use config::{
    AssetConfig, AssetKind, AuthConfig, AuthProviderKind, FallbackConfig, PrimaryConfig,
    ServerConfig, SiteConfig,
};
pub use error::ValidationError;
pub use models::{Category, Post, PostDraft, Record, RecordId, Subscriber};
pub use reconcile::{ConnectionState, CreateOutcome, DeleteOutcome, Reconciler, StoreLocation};
pub use site::{ImageUpload, Site};
pub use storage::{
    DocumentStore, HttpDocumentStore, InMemoryDocumentStore, LocalRecordFile,
    OfflineDocumentStore, SqliteDocumentStore,
};
