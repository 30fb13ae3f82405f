//! Playback proxy and player seams
//!
//! The downloaded media is handed to a playback proxy that turns a local
//! file URL into something a player can open, and the resulting URI goes
//! to the player. Both sides are capability traits so the orchestration
//! flow stays independent of any concrete player stack.

use crate::{
    error::{Error, Result},
    types::SourceType,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Parameters attached to a proxied media source
#[derive(Debug, Clone, Default)]
pub struct MediaSourceParams {
    /// MIME type of the source content
    pub content_type: Option<String>,
    /// Sidecar subtitle file URL
    pub subtitle_url: Option<String>,
    /// Subtitle language tag
    pub subtitle_lang: Option<String>,
    /// Human-readable subtitle track name
    pub subtitle_name: Option<String>,
}

impl MediaSourceParams {
    /// Params for a source type, without subtitles
    pub fn for_source(source_type: SourceType) -> Self {
        Self {
            content_type: Some(source_type.content_type().to_string()),
            ..Default::default()
        }
    }

    /// Attach a default-labeled subtitle sidecar
    pub fn with_subtitles(mut self, url: impl Into<String>) -> Self {
        self.subtitle_url = Some(url.into());
        self.subtitle_lang = Some("default".to_string());
        self.subtitle_name = Some("default subtitle".to_string());
        self
    }
}

/// Capability interface over an opaque playback proxy
#[async_trait]
pub trait PlaybackProxy: Send + Sync {
    /// Start the proxy; must precede any `make_url` call
    async fn start(&self) -> Result<()>;

    /// Stop the proxy
    async fn stop(&self) -> Result<()>;

    /// Resolve a local file URL into a playable URI
    async fn make_url(
        &self,
        file_url: &str,
        source_type: SourceType,
        params: &MediaSourceParams,
    ) -> Result<Url>;
}

/// Sink that receives the final playable URI
#[async_trait]
pub trait Player: Send + Sync {
    /// Prepare the player with a source; playback follows when ready
    async fn prepare(&self, source: Url) -> Result<()>;
}

/// Local stand-in [`PlaybackProxy`].
///
/// Does not run a license-aware media server; it validates the file URL
/// and annotates it with the source parameters so downstream tooling can
/// see what a real proxy would be asked to serve.
#[derive(Default)]
pub struct LocalPlaybackProxy {
    started: AtomicBool,
}

impl LocalPlaybackProxy {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaybackProxy for LocalPlaybackProxy {
    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        debug!("playback proxy started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::Release);
        Ok(())
    }

    async fn make_url(
        &self,
        file_url: &str,
        source_type: SourceType,
        params: &MediaSourceParams,
    ) -> Result<Url> {
        if !self.started.load(Ordering::Acquire) {
            return Err(Error::PlaybackProxy("proxy not started".to_string()));
        }

        let mut url = Url::parse(file_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("source", &source_type.to_string());
            if let Some(ct) = &params.content_type {
                query.append_pair("content_type", ct);
            }
            if let Some(sub) = &params.subtitle_url {
                query.append_pair("subtitles", sub);
            }
            if let Some(lang) = &params.subtitle_lang {
                query.append_pair("subtitle_lang", lang);
            }
        }
        Ok(url)
    }
}

/// Player that logs and remembers the last prepared source
#[derive(Default)]
pub struct LogPlayer {
    last_source: RwLock<Option<Url>>,
}

impl LogPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last source handed to the player, if any
    pub async fn last_source(&self) -> Option<Url> {
        self.last_source.read().await.clone()
    }
}

#[async_trait]
impl Player for LogPlayer {
    async fn prepare(&self, source: Url) -> Result<()> {
        info!(source = %source, "player prepared");
        *self.last_source.write().await = Some(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_make_url_requires_started_proxy() {
        let proxy = LocalPlaybackProxy::new();
        let params = MediaSourceParams::for_source(SourceType::SingleFile);
        let err = proxy
            .make_url("file:///d/media.m4f", SourceType::SingleFile, &params)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PLAYBACK_PROXY");
    }

    #[tokio::test]
    async fn test_make_url_annotates_source() {
        let proxy = LocalPlaybackProxy::new();
        proxy.start().await.unwrap();

        let params = MediaSourceParams::for_source(SourceType::SingleFile)
            .with_subtitles("file:///d/subs.vtt");
        let url = proxy
            .make_url("file:///d/media.m4f", SourceType::SingleFile, &params)
            .await
            .unwrap();

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("source".to_string(), "single-file".to_string())));
        assert!(query.contains(&("content_type".to_string(), "video/mp4".to_string())));
        assert!(query.contains(&("subtitles".to_string(), "file:///d/subs.vtt".to_string())));
    }

    #[tokio::test]
    async fn test_log_player_remembers_source() {
        let player = LogPlayer::new();
        assert!(player.last_source().await.is_none());

        let url = Url::parse("file:///d/media.m4f").unwrap();
        player.prepare(url.clone()).await.unwrap();
        assert_eq!(player.last_source().await, Some(url));
    }
}
