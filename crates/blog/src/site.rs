//! The assembled blog backend
//!
//! `Site` owns one reconciler per record type, the asset store used for
//! uploaded images and the optional admin authentication service.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::assets::{AssetStore, FileAssetStore, InlineAssetStore};
use crate::auth::{AuthService, FirebaseIdentityProvider, InMemoryIdentityProvider};
use crate::config::{AssetKind, AuthProviderKind, PrimaryConfig, SiteConfig};
use crate::error::ValidationError;
use crate::models::{Post, PostDraft, Subscriber};
use crate::reconcile::{CreateOutcome, Reconciler};
use crate::samples::sample_posts;
use crate::storage::{
    DocumentStore, HttpDocumentStore, InMemoryDocumentStore, LocalRecordFile,
    OfflineDocumentStore, SqliteDocumentStore,
};

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-supplied file name
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Blog backend state shared by every request
pub struct Site {
    pub blogs: Reconciler<Post>,
    pub emails: Reconciler<Subscriber>,
    pub assets: Arc<dyn AssetStore>,
    pub auth: Option<AuthService>,
    default_image: String,
    protect_admin: bool,
}

impl Site {
    /// Build every store described by `config`
    pub fn open(config: &SiteConfig) -> Result<Self> {
        let primary = open_primary(&config.primary)?;
        info!("Using {} as the primary document store", primary.name());

        let fallback = &config.fallback;
        let seed = if config.seeds_samples() {
            sample_posts()
        } else {
            Vec::new()
        };

        let (blog_file, email_file) = if fallback.persist {
            fs::create_dir_all(&fallback.dir).with_context(|| {
                format!("Failed to create fallback directory {}", fallback.dir.display())
            })?;
            (
                LocalRecordFile::open(fallback.blogs_path(), seed),
                LocalRecordFile::open(fallback.emails_path(), Vec::new()),
            )
        } else {
            (LocalRecordFile::in_memory(seed), LocalRecordFile::in_memory(Vec::new()))
        };

        let assets: Arc<dyn AssetStore> = match config.assets.kind {
            AssetKind::Directory => Arc::new(FileAssetStore::new(
                &config.assets.root,
                &config.assets.url_prefix,
            )?),
            AssetKind::Inline => Arc::new(InlineAssetStore),
        };

        let auth = open_auth(config)?;
        if config.auth.protect_admin && auth.is_none() {
            warn!("Admin protection requested but authentication is disabled");
        }

        Ok(Self {
            blogs: Reconciler::new(primary.clone(), blog_file).with_assets(assets.clone()),
            emails: Reconciler::new(primary, email_file),
            assets,
            auth,
            default_image: config.assets.default_image.clone(),
            protect_admin: config.auth.protect_admin,
        })
    }

    /// Assemble a site from already-built parts
    pub fn from_parts(
        blogs: Reconciler<Post>,
        emails: Reconciler<Subscriber>,
        assets: Arc<dyn AssetStore>,
        auth: Option<AuthService>,
    ) -> Self {
        Self {
            blogs: blogs.with_assets(assets.clone()),
            emails,
            assets,
            auth,
            default_image: SiteConfig::default().assets.default_image,
            protect_admin: false,
        }
    }

    /// Require a signed-in session on admin endpoints
    pub fn with_protect_admin(mut self, protect_admin: bool) -> Self {
        self.protect_admin = protect_admin;
        self
    }

    /// Whether admin endpoints need a session
    ///
    /// Always false when no identity provider is configured.
    pub fn admin_protected(&self) -> bool {
        self.protect_admin && self.auth.is_some()
    }

    /// Image reference used when an upload can't be stored
    pub fn default_image(&self) -> &str {
        &self.default_image
    }

    /// Validate a submission, store its image and create the post
    ///
    /// Text fields are checked before anything is written. If the image
    /// can't be stored the default image is used instead.
    pub fn create_post(
        &self,
        draft: PostDraft,
        image: Option<ImageUpload>,
    ) -> Result<CreateOutcome, ValidationError> {
        draft.check()?;
        let image = image
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or(ValidationError::MissingField("Image"))?;

        let (reference, stored) = match self.assets.store(&image.bytes, &image.name) {
            Ok(reference) => (reference, true),
            Err(e) => {
                warn!("Failed to store image {}: {:#}, using default", image.name, e);
                (self.default_image.clone(), false)
            }
        };

        let result = draft
            .into_post(reference.clone())
            .and_then(|post| self.blogs.create(post));

        if result.is_err()
            && stored
            && let Err(e) = self.assets.delete(&reference)
        {
            warn!("Failed to remove orphaned image {}: {:#}", reference, e);
        }

        result
    }

    /// Validate and store a subscriber email
    pub fn subscribe(&self, email: &str) -> Result<CreateOutcome, ValidationError> {
        self.emails.create(Subscriber::new(email))
    }
}

fn open_primary(config: &PrimaryConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config {
        PrimaryConfig::Http {
            url,
            api_key,
            data_source,
            database,
            timeout_ms,
        } => Arc::new(HttpDocumentStore::new(
            url,
            api_key.clone(),
            data_source.clone(),
            database.clone(),
            Duration::from_millis(*timeout_ms),
        )?),
        PrimaryConfig::Sqlite { path } => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Arc::new(SqliteDocumentStore::new(path)?)
        }
        PrimaryConfig::Memory => Arc::new(InMemoryDocumentStore::new()),
        PrimaryConfig::Offline => Arc::new(OfflineDocumentStore),
    };
    Ok(store)
}

fn open_auth(config: &SiteConfig) -> Result<Option<AuthService>> {
    let service = match config.auth.provider {
        AuthProviderKind::Disabled => return Ok(None),
        AuthProviderKind::Memory => AuthService::new(Box::new(InMemoryIdentityProvider::new())),
        AuthProviderKind::Firebase => {
            let api_key = config
                .auth
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .context("Firebase authentication needs auth.api_key or FIREBASE_API_KEY")?;
            let timeout = match &config.primary {
                PrimaryConfig::Http { timeout_ms, .. } => Duration::from_millis(*timeout_ms),
                _ => Duration::from_secs(10),
            };
            AuthService::new(Box::new(FirebaseIdentityProvider::new(api_key, timeout)))
        }
    };
    Ok(Some(service.with_max_session_age(config.auth.session_age())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetConfig, AuthConfig, FallbackConfig};
    use crate::models::Category;
    use crate::reconcile::StoreLocation;
    use tempfile::TempDir;

    fn draft(title: &str) -> PostDraft {
        PostDraft {
            title: Some(title.to_string()),
            description: Some("<p>Body</p>".to_string()),
            category: Some("Technology".to_string()),
            author: Some("Ada".to_string()),
            author_img: None,
        }
    }

    fn upload() -> ImageUpload {
        ImageUpload {
            name: "cover.png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    fn config(dir: &TempDir) -> SiteConfig {
        SiteConfig {
            primary: PrimaryConfig::Memory,
            fallback: FallbackConfig {
                dir: dir.path().join("data"),
                persist: true,
                seed_samples: Some(false),
            },
            assets: AssetConfig {
                root: dir.path().join("uploads"),
                ..AssetConfig::default()
            },
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_open_creates_directories() {
        let dir = TempDir::new().unwrap();
        let site = Site::open(&config(&dir)).unwrap();

        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("uploads").is_dir());
        assert!(site.auth.is_none());
        assert!(!site.admin_protected());
        assert!(site.blogs.list().is_empty());
    }

    #[test]
    fn test_open_seeds_samples() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.primary = PrimaryConfig::Offline;
        config.fallback.seed_samples = None;

        let site = Site::open(&config).unwrap();
        assert_eq!(site.blogs.list().len(), 4);
        assert!(site.blogs.get("sample3").is_some());
    }

    #[test]
    fn test_no_samples_beside_a_primary_by_default() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.fallback.seed_samples = None;

        let site = Site::open(&config).unwrap();
        assert!(site.blogs.list().is_empty());
        assert!(site.blogs.local().is_empty());
    }

    #[test]
    fn test_create_post_stores_image() {
        let dir = TempDir::new().unwrap();
        let site = Site::open(&config(&dir)).unwrap();

        let outcome = site.create_post(draft("Hello"), Some(upload())).unwrap();
        assert_eq!(outcome.location, StoreLocation::Primary);

        let post = site.blogs.get(outcome.id.as_str()).unwrap();
        assert_eq!(post.category, Category::Technology);
        assert!(post.image.starts_with("/uploads/"));
        assert_eq!(post.author_img, "/profile_icon.png");

        let files = fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_invalid_post_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let site = Site::open(&config(&dir)).unwrap();

        let mut bad = draft("");
        bad.title = None;
        assert_eq!(
            site.create_post(bad, Some(upload())),
            Err(ValidationError::MissingField("Title"))
        );
        assert_eq!(
            site.create_post(draft("No image"), None),
            Err(ValidationError::MissingField("Image"))
        );

        let files = fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(files, 0);
        assert!(site.blogs.list().is_empty());
    }

    #[test]
    fn test_delete_post_removes_image() {
        let dir = TempDir::new().unwrap();
        let site = Site::open(&config(&dir)).unwrap();

        let outcome = site.create_post(draft("Hello"), Some(upload())).unwrap();
        site.blogs.delete(outcome.id.as_str());

        let files = fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(files, 0);
    }

    #[test]
    fn test_subscribe_offline_persists() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.primary = PrimaryConfig::Offline;

        let site = Site::open(&config).unwrap();
        let outcome = site.subscribe("reader@example.com").unwrap();
        assert!(outcome.used_fallback());
        assert!(dir.path().join("data/local-emails.json").exists());

        // Reopening reads the same file
        let reopened = Site::open(&config).unwrap();
        assert_eq!(reopened.emails.list().len(), 1);
    }

    #[test]
    fn test_memory_auth() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.auth = AuthConfig {
            provider: AuthProviderKind::Memory,
            api_key: None,
            protect_admin: true,
            session_minutes: Some(30),
        };

        let site = Site::open(&config).unwrap();
        assert!(site.admin_protected());

        let auth = site.auth.as_ref().unwrap();
        let session = auth.sign_up("admin@example.com", "secret1", "Admin").unwrap();
        let lifetime = session.expires_at.unwrap() - session.signed_in_at;
        assert_eq!(lifetime.num_minutes(), 30);
    }

    #[test]
    fn test_firebase_requires_key() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.auth.provider = AuthProviderKind::Firebase;
        assert!(Site::open(&config).is_err());
    }
}
