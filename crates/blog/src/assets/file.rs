//! File-based asset storage
//!
//! Directory structure:
//! ```text
//! public/uploads/
//!   1717171717171_cover.png     # served as /uploads/1717171717171_cover.png
//!   1717171718000_header.jpg
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use log::debug;

use super::AssetStore;

/// Stores assets as files in a directory served under `url_prefix`
pub struct FileAssetStore {
    root: PathBuf,
    url_prefix: String,
}

impl FileAssetStore {
    /// Create a new file asset store at the given path
    ///
    /// # Arguments
    /// * `root` - Directory the files are written to
    /// * `url_prefix` - Public path the directory is served under, e.g. `/uploads`
    pub fn new(root: impl AsRef<Path>, url_prefix: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).context("Failed to create asset directory")?;
        Ok(Self {
            root,
            url_prefix: format!("/{}", url_prefix.trim_matches('/')),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Map a reference back to a file in this store, if it is one of ours
    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let file_name = reference
            .strip_prefix(self.url_prefix.as_str())?
            .strip_prefix('/')?;

        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return None;
        }
        Some(self.root.join(file_name))
    }
}

/// Keep a file name to a safe character set
fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

impl AssetStore for FileAssetStore {
    fn store(&self, bytes: &[u8], name: &str) -> Result<String> {
        if bytes.is_empty() {
            bail!("refusing to store an empty asset");
        }

        let file_name = format!("{}_{}", Utc::now().timestamp_millis(), sanitize(name));
        let path = self.root.join(&file_name);

        // Write atomically (write to temp, then rename)
        let temp_path = self.root.join(format!(".{}.tmp", file_name));
        fs::write(&temp_path, bytes)
            .with_context(|| format!("Failed to write asset {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to move asset into {}", path.display()))?;

        debug!("Stored asset {}", path.display());
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    fn delete(&self, reference: &str) -> Result<()> {
        let Some(path) = self.path_for(reference) else {
            return Ok(());
        };

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete asset {}", path.display()))?;
            debug!("Deleted asset {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_and_delete() {
        let dir = tempdir().unwrap();
        let store = FileAssetStore::new(dir.path().join("uploads"), "/uploads/").unwrap();

        let reference = store.store(b"png bytes", "cover.png").unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with("_cover.png"));

        let path = store.path_for(&reference).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"png bytes");

        store.delete(&reference).unwrap();
        assert!(!path.exists());

        // Deleting again is a no-op
        store.delete(&reference).unwrap();
    }

    #[test]
    fn test_ignores_foreign_references() {
        let dir = tempdir().unwrap();
        let store = FileAssetStore::new(dir.path(), "uploads").unwrap();

        assert!(store.path_for("/blog_pic_1.png").is_none());
        assert!(store.path_for("https://cdn.example.com/x.png").is_none());
        assert!(store.path_for("/uploads/../secret").is_none());
        assert!(store.path_for("/uploads/").is_none());
        assert!(store.delete("/blog_pic_1.png").is_ok());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\Users\\me\\a.jpg"), "a.jpg");
        assert_eq!(sanitize(""), "upload");
        assert_eq!(sanitize(".hidden"), "hidden");
    }

    #[test]
    fn test_rejects_empty() {
        let dir = tempdir().unwrap();
        let store = FileAssetStore::new(dir.path(), "/uploads").unwrap();
        assert!(store.store(b"", "a.png").is_err());
    }
}
