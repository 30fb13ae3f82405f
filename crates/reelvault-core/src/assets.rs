//! Bundled asset access
//!
//! License acquisition tokens ship alongside the application. The session
//! only needs to read one named text asset, so the seam is a single-method
//! trait with a directory-backed implementation.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Read-only access to bundled text assets
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Full contents of the named asset
    async fn read_text(&self, name: &str) -> Result<String>;
}

/// Asset store over a plain directory
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for DirAssetStore {
    async fn read_text(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::TokenNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_named_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("license-token.xml"), "<token/>").unwrap();

        let store = DirAssetStore::new(dir.path());
        let token = store.read_text("license-token.xml").await.unwrap();
        assert_eq!(token, "<token/>");
    }

    #[tokio::test]
    async fn test_missing_asset_is_token_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path());
        let err = store.read_text("license-token.xml").await.unwrap_err();
        assert_eq!(err.error_code(), "TOKEN_NOT_FOUND");
    }
}
