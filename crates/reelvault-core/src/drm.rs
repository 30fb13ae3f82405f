//! DRM runtime interface
//!
//! License acquisition cryptography lives in an external runtime; this
//! module defines the narrow capability the orchestration flow depends on
//! (initialize, personalize, token-for-license exchange) plus a
//! file-backed runtime that records personalization and license state
//! under its store directory.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// An acquired content license
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    /// License identifier
    pub id: String,
    /// Expiration time (Unix timestamp, 0 = no expiration)
    pub expiration: u64,
}

impl License {
    /// Check if the license has expired
    pub fn is_expired(&self) -> bool {
        if self.expiration == 0 {
            return false;
        }
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now >= self.expiration
    }
}

/// Capability interface over an opaque DRM runtime.
///
/// `personalize` and `process_service_token` are long-running calls in
/// real runtimes; callers keep them off any interactive context while
/// preserving their sequential dependency.
#[async_trait]
pub trait DrmRuntime: Send + Sync {
    /// Initialize the runtime with its key-store directory
    async fn initialize(&self, store_dir: &str) -> Result<()>;

    /// Whether DRM keys have already been acquired for this install
    async fn is_personalized(&self) -> Result<bool>;

    /// Acquire DRM keys; required once per fresh install
    async fn personalize(&self) -> Result<()>;

    /// Exchange a license acquisition token for a content license
    async fn process_service_token(&self, token: &str) -> Result<License>;
}

/// Marker file recording personalization inside the store directory
const PERSONALIZATION_MARKER: &str = "personalization";

/// File-backed [`DrmRuntime`].
///
/// Stands in for an external runtime: personalization drops a marker file
/// and each processed token is recorded as a license file under
/// `licenses/`. No cryptography is performed.
#[derive(Default)]
pub struct PersistedDrmRuntime {
    store: RwLock<Option<PathBuf>>,
}

impl PersistedDrmRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    async fn store_dir(&self) -> Result<PathBuf> {
        self.store
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::RuntimeInit("runtime not initialized".to_string()))
    }
}

#[async_trait]
impl DrmRuntime for PersistedDrmRuntime {
    async fn initialize(&self, store_dir: &str) -> Result<()> {
        tokio::fs::create_dir_all(store_dir)
            .await
            .map_err(|e| Error::RuntimeInit(format!("cannot create store {store_dir}: {e}")))?;
        *self.store.write().await = Some(PathBuf::from(store_dir));
        debug!(store = %store_dir, "DRM runtime initialized");
        Ok(())
    }

    async fn is_personalized(&self) -> Result<bool> {
        let store = self.store_dir().await?;
        Ok(tokio::fs::try_exists(store.join(PERSONALIZATION_MARKER))
            .await
            .unwrap_or(false))
    }

    async fn personalize(&self) -> Result<()> {
        let store = self.store_dir().await?;
        tokio::fs::write(store.join(PERSONALIZATION_MARKER), b"ok")
            .await
            .map_err(|e| Error::Personalization(e.to_string()))?;
        info!("runtime personalized");
        Ok(())
    }

    async fn process_service_token(&self, token: &str) -> Result<License> {
        if token.trim().is_empty() {
            return Err(Error::drm("empty license acquisition token"));
        }
        let store = self.store_dir().await?;

        let license = License {
            id: Uuid::new_v4().to_string(),
            expiration: 0,
        };

        let dir = store.join("licenses");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::drm(e.to_string()))?;
        let record = serde_json::to_vec_pretty(&license)
            .map_err(|e| Error::drm(e.to_string()))?;
        tokio::fs::write(dir.join(format!("{}.json", license.id)), record)
            .await
            .map_err(|e| Error::drm(e.to_string()))?;

        info!(license_id = %license.id, "license recorded");
        Ok(license)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_personalization_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = PersistedDrmRuntime::new();
        runtime.initialize(dir.path().to_str().unwrap()).await.unwrap();

        assert!(!runtime.is_personalized().await.unwrap());
        runtime.personalize().await.unwrap();
        assert!(runtime.is_personalized().await.unwrap());
    }

    #[tokio::test]
    async fn test_uninitialized_runtime_errors() {
        let runtime = PersistedDrmRuntime::new();
        let err = runtime.is_personalized().await.unwrap_err();
        assert_eq!(err.error_code(), "RUNTIME_INIT");
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = PersistedDrmRuntime::new();
        runtime.initialize(dir.path().to_str().unwrap()).await.unwrap();

        let err = runtime.process_service_token("  ").await.unwrap_err();
        assert_eq!(err.error_code(), "LICENSE_ACQUIRE");
    }

    #[tokio::test]
    async fn test_token_exchange_records_license() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = PersistedDrmRuntime::new();
        runtime.initialize(dir.path().to_str().unwrap()).await.unwrap();

        let license = runtime
            .process_service_token("<ActionToken>sample</ActionToken>")
            .await
            .unwrap();
        assert!(!license.is_expired());

        let record = dir.path().join("licenses").join(format!("{}.json", license.id));
        assert!(record.exists());
    }
}
