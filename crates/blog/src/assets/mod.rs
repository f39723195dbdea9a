//! Binary asset storage for uploaded images
//!
//! Assets are addressed by the reference string returned from `store`,
//! which is what gets saved on the owning record.

mod file;
mod inline;

pub use file::FileAssetStore;
pub use inline::InlineAssetStore;

use anyhow::Result;

/// Trait for asset storage operations
pub trait AssetStore: Send + Sync {
    /// Store bytes under a name derived from `name`, returning a reference
    fn store(&self, bytes: &[u8], name: &str) -> Result<String>;

    /// Delete the asset behind `reference`
    ///
    /// References this store did not produce are ignored.
    fn delete(&self, reference: &str) -> Result<()>;
}

/// Guess a MIME type from a file name's extension
pub fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
