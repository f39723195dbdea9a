//! Integration tests for the blog crate
//!
//! These tests drive the reconciliation layer over real backends: SQLite
//! as the primary store, JSON record files on disk as the fallback.

use std::sync::Arc;

use blog::models::Record;
use blog::{
    Category, ConnectionState, DeleteOutcome, DocumentStore, FileAssetStore,
    InMemoryDocumentStore, LocalRecordFile, OfflineDocumentStore, Post, PostDraft, Reconciler,
    SqliteDocumentStore, StoreLocation, Subscriber, ValidationError,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Helper to create a valid post
fn make_post(title: &str, category: Category, age_minutes: i64) -> Post {
    Post::new(title, "<p>Body</p>", category, "Ada Lovelace", "/blog_pic_1.png")
        .with_created_at(Utc::now() - Duration::minutes(age_minutes))
}

/// Reconciler over a switchable in-memory primary and an on-disk record file
fn switchable(dir: &TempDir) -> (Arc<InMemoryDocumentStore>, Reconciler<Post>) {
    let primary = Arc::new(InMemoryDocumentStore::new());
    let local = LocalRecordFile::open(dir.path().join("local-blogs.json"), Vec::new());
    (primary.clone(), Reconciler::new(primary, local))
}

#[test]
fn test_create_then_get_matches_input() {
    let dir = TempDir::new().unwrap();
    let primary = Arc::new(SqliteDocumentStore::new(dir.path().join("primary.db")).unwrap());
    let blogs: Reconciler<Post> = Reconciler::new(primary, LocalRecordFile::in_memory(Vec::new()));

    let input =
        make_post("Ownership in practice", Category::Technology, 0).with_author_img("/me.png");
    let outcome = blogs.create(input.clone()).unwrap();
    assert_eq!(outcome.location, StoreLocation::Primary);
    assert!(!outcome.id.is_empty());

    let stored = blogs.get(outcome.id.as_str()).unwrap();
    assert_eq!(stored.id, outcome.id);
    assert_eq!(stored.title, input.title);
    assert_eq!(stored.description, input.description);
    assert_eq!(stored.category, input.category);
    assert_eq!(stored.author, input.author);
    assert_eq!(stored.image, input.image);
    assert_eq!(stored.author_img, "/me.png");
    assert_eq!(stored.created_at, input.created_at);
}

#[test]
fn test_empty_email_rejected_before_any_store() {
    let dir = TempDir::new().unwrap();
    let primary = Arc::new(InMemoryDocumentStore::new());
    let emails = Reconciler::new(
        primary.clone(),
        LocalRecordFile::open(dir.path().join("local-emails.json"), Vec::<Subscriber>::new()),
    );

    for email in ["", "   "] {
        assert_eq!(
            emails.create(Subscriber::new(email)),
            Err(ValidationError::MissingField("Email"))
        );
    }

    assert_eq!(primary.operations(), 0);
    assert!(emails.local().is_empty());
    assert!(!dir.path().join("local-emails.json").exists());
}

#[test]
fn test_delete_twice_is_safe() {
    let dir = TempDir::new().unwrap();
    let (primary, blogs) = switchable(&dir);

    let in_primary = blogs.create(make_post("P", Category::Startup, 0)).unwrap();
    primary.set_available(false);
    let in_local = blogs.create(make_post("L", Category::Startup, 0)).unwrap();

    assert_eq!(blogs.delete(in_local.id.as_str()), DeleteOutcome::Fallback);
    assert_eq!(blogs.delete(in_local.id.as_str()), DeleteOutcome::NotFound);

    primary.set_available(true);
    assert_eq!(blogs.delete(in_primary.id.as_str()), DeleteOutcome::Primary);
    assert_eq!(blogs.delete(in_primary.id.as_str()), DeleteOutcome::NotFound);
}

#[test]
fn test_operations_complete_while_primary_down() {
    let dir = TempDir::new().unwrap();
    let blogs: Reconciler<Post> = Reconciler::new(
        Arc::new(OfflineDocumentStore),
        LocalRecordFile::open(dir.path().join("local-blogs.json"), Vec::new()),
    );

    assert!(blogs.list().is_empty());

    let first = blogs.create(make_post("One", Category::Lifestyle, 2)).unwrap();
    let second = blogs.create(make_post("Two", Category::Lifestyle, 1)).unwrap();
    assert!(first.used_fallback() && second.used_fallback());
    assert_ne!(first.id, second.id);
    assert_eq!(blogs.connection_state(), ConnectionState::Disconnected);

    let titles: Vec<String> = blogs.list().into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["Two", "One"]);

    assert_eq!(blogs.delete(first.id.as_str()), DeleteOutcome::Fallback);
    assert_eq!(blogs.list().len(), 1);

    // The file on disk reflects the surviving record
    let reopened: LocalRecordFile<Post> =
        LocalRecordFile::open(dir.path().join("local-blogs.json"), Vec::new());
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.all()[0].id, second.id);
}

#[test]
fn test_merge_is_deterministic_and_deduplicated() {
    let dir = TempDir::new().unwrap();
    let primary = Arc::new(InMemoryDocumentStore::new());

    // A local record that shares its id with a primary document
    let shadowed = make_post("Local copy", Category::Technology, 0).with_id("shared");
    let local_only = make_post("Local only", Category::Technology, 5).with_id("1700000000000");
    let blogs = Reconciler::new(
        primary.clone(),
        LocalRecordFile::open(
            dir.path().join("local-blogs.json"),
            vec![shadowed, local_only],
        ),
    );

    let mut primary_doc =
        serde_json::to_value(make_post("Primary copy", Category::Technology, 10)).unwrap();
    primary_doc["_id"] = serde_json::json!("shared");
    primary.insert_with_id("blogs", "shared", primary_doc);
    blogs.create(make_post("Primary newer", Category::Startup, 1)).unwrap();

    let first = blogs.list();
    let second = blogs.list();

    let ids = |posts: &[Post]| posts.iter().map(|p| p.id().to_string()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));

    let titles: Vec<&str> = first.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Primary newer", "Primary copy", "Local only"]);
}

#[test]
fn test_fallback_post_scenario() {
    let dir = TempDir::new().unwrap();
    let (primary, blogs) = switchable(&dir);
    primary.set_available(false);

    let draft = PostDraft {
        title: Some("A".to_string()),
        description: Some("<p>Draft body</p>".to_string()),
        category: Some("Technology".to_string()),
        author: Some("Ada".to_string()),
        author_img: None,
    };
    let outcome = blogs.create(draft.into_post("/blog_pic_2.png").unwrap()).unwrap();
    assert!(outcome.used_fallback());

    let listed = blogs.list();
    assert!(
        listed
            .iter()
            .any(|p| p.title == "A" && p.category == Category::Technology)
    );

    // Recovery: the primary is consulted again and the local post remains visible
    primary.set_available(true);
    assert_eq!(blogs.list().len(), 1);
    assert_eq!(blogs.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_deleting_post_removes_uploaded_image() {
    let dir = TempDir::new().unwrap();
    let assets = Arc::new(FileAssetStore::new(dir.path().join("uploads"), "/uploads").unwrap());
    let primary = Arc::new(SqliteDocumentStore::in_memory().unwrap());
    let blogs: Reconciler<Post> = Reconciler::new(primary, LocalRecordFile::in_memory(Vec::new()))
        .with_assets(assets.clone());

    let reference = blog::AssetStore::store(assets.as_ref(), b"image bytes", "cover.png").unwrap();
    let post = Post::new("T", "D", Category::Startup, "A", reference.clone());
    let outcome = blogs.create(post).unwrap();

    let file_name = reference.trim_start_matches("/uploads/");
    assert!(dir.path().join("uploads").join(file_name).exists());

    assert_eq!(blogs.delete(outcome.id.as_str()), DeleteOutcome::Primary);
    assert!(!dir.path().join("uploads").join(file_name).exists());
}

#[test]
fn test_deleting_local_post_removes_uploaded_image() {
    let dir = TempDir::new().unwrap();
    let assets = Arc::new(FileAssetStore::new(dir.path().join("uploads"), "/uploads").unwrap());
    let local = LocalRecordFile::open(dir.path().join("local-blogs.json"), Vec::new());
    let blogs: Reconciler<Post> =
        Reconciler::new(Arc::new(OfflineDocumentStore), local).with_assets(assets.clone());

    let reference = blog::AssetStore::store(assets.as_ref(), b"image bytes", "cover.png").unwrap();
    let file = dir
        .path()
        .join("uploads")
        .join(reference.trim_start_matches("/uploads/"));
    let outcome = blogs
        .create(Post::new("T", "D", Category::Lifestyle, "A", reference))
        .unwrap();
    assert!(outcome.used_fallback());
    assert!(file.exists());

    assert_eq!(blogs.delete(outcome.id.as_str()), DeleteOutcome::Fallback);
    assert!(!file.exists());
    assert!(blogs.list().is_empty());
}

#[test]
fn test_sqlite_primary_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("primary.db");

    let id = {
        let store = SqliteDocumentStore::new(&db).unwrap();
        let emails: Reconciler<Subscriber> =
            Reconciler::new(Arc::new(store), LocalRecordFile::in_memory(Vec::new()));
        emails.create(Subscriber::new("reader@example.com")).unwrap().id
    };

    let store = SqliteDocumentStore::new(&db).unwrap();
    assert!(store.ping().is_ok());
    let emails: Reconciler<Subscriber> =
        Reconciler::new(Arc::new(store), LocalRecordFile::in_memory(Vec::new()));
    let found = emails.get(id.as_str()).unwrap();
    assert_eq!(found.email, "reader@example.com");
}
