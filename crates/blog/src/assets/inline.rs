//! Inline asset storage for deployments without a writable disk

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{AssetStore, mime_for};

/// Encodes assets as `data:` URIs stored directly on the record
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineAssetStore;

impl AssetStore for InlineAssetStore {
    fn store(&self, bytes: &[u8], name: &str) -> Result<String> {
        if bytes.is_empty() {
            bail!("refusing to store an empty asset");
        }
        Ok(format!("data:{};base64,{}", mime_for(name), STANDARD.encode(bytes)))
    }

    fn delete(&self, _reference: &str) -> Result<()> {
        Ok(())
    }
}
