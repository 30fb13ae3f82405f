//! Download engine interface and reference implementation
//!
//! The orchestration flow never talks to a concrete downloader directly;
//! it drives the narrow [`DownloadEngine`] capability trait so the real
//! engine (an external SDK, the bundled HTTP engine, or a test fake) stays
//! substitutable.

use crate::{
    error::{Error, Result},
    types::*,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Asynchronous notification from the download engine.
///
/// Delivered on the engine's own worker context; consumers marshal any
/// user-facing side effect onto their own serialized context.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Overall engine state changed
    State(EngineState),
    /// Progress update for one tracked content path
    Progress(ContentStatus),
}

/// Capability interface over an opaque media download engine
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Overall engine state and the set of tracked content paths
    async fn query_status(&self) -> Result<DownloadStatus>;

    /// State and completion percentage for one tracked path
    async fn query_content_status(&self, path: &str) -> Result<ContentStatus>;

    /// Apply transfer constraints; affects content added afterwards
    async fn set_constraints(&self, constraints: Constraints) -> Result<()>;

    /// Register content for download into `dir`
    async fn add_content(&self, dir: &str, content: &ContentDescriptor) -> Result<()>;

    /// Resume transfers (fresh engines start paused)
    async fn resume(&self) -> Result<()>;

    /// Cancel and forget one tracked path
    async fn cancel_content(&self, path: &str) -> Result<()>;

    /// Subscribe to state and progress notifications
    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent>;
}

/// Per-path bookkeeping for the HTTP engine
struct ContentEntry {
    descriptor: ContentDescriptor,
    state: ContentState,
    percentage: u8,
    handle: Option<JoinHandle<()>>,
}

struct EngineShared {
    state: RwLock<EngineState>,
    contents: RwLock<HashMap<String, ContentEntry>>,
    constraints: RwLock<Constraints>,
    transfer_slots: RwLock<Arc<Semaphore>>,
    running_tx: watch::Sender<bool>,
    listeners: std::sync::Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>,
}

impl EngineShared {
    /// Fan an event out to all live subscribers
    fn broadcast(&self, event: EngineEvent) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    async fn set_content_progress(&self, path: &str, state: ContentState, percentage: u8) {
        let mut contents = self.contents.write().await;
        if let Some(entry) = contents.get_mut(path) {
            entry.state = state;
            entry.percentage = percentage;
        }
        drop(contents);
        self.broadcast(EngineEvent::Progress(ContentStatus::new(
            path, state, percentage,
        )));
    }
}

/// Reference [`DownloadEngine`] backed by plain HTTP transfers.
///
/// One tokio task per content item streams the source URL into
/// `<dir>/<media_file_name>`. Fresh engines start paused: items are
/// registered `Pending` and wait behind a resume gate, mirroring the
/// external engines this trait abstracts. `max_connections` is enforced
/// with a semaphore; the bandwidth cap is recorded but not shaped.
#[derive(Clone)]
pub struct HttpDownloadEngine {
    client: reqwest::Client,
    shared: Arc<EngineShared>,
}

impl HttpDownloadEngine {
    pub fn new() -> Self {
        let constraints = Constraints::default();
        let (running_tx, _) = watch::channel(false);
        Self {
            client: reqwest::Client::new(),
            shared: Arc::new(EngineShared {
                state: RwLock::new(EngineState::Paused),
                contents: RwLock::new(HashMap::new()),
                constraints: RwLock::new(constraints),
                transfer_slots: RwLock::new(Arc::new(Semaphore::new(
                    constraints.max_connections as usize,
                ))),
                running_tx,
                listeners: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    /// Currently applied constraints
    pub async fn constraints(&self) -> Constraints {
        *self.shared.constraints.read().await
    }

    /// Transfer task body: wait for the resume gate, take a connection
    /// slot, then stream the source to disk emitting percentage updates.
    async fn run_transfer(
        client: reqwest::Client,
        shared: Arc<EngineShared>,
        dir: String,
        descriptor: ContentDescriptor,
    ) {
        let mut running_rx = shared.running_tx.subscribe();
        while !*running_rx.borrow() {
            if running_rx.changed().await.is_err() {
                return;
            }
        }

        let slots = shared.transfer_slots.read().await.clone();
        let _permit = match slots.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        match Self::transfer(&client, &shared, &dir, &descriptor).await {
            Ok(()) => {
                info!(path = %dir, "content download complete");
                shared
                    .set_content_progress(&dir, ContentState::Completed, 100)
                    .await;
            }
            Err(e) => {
                warn!(path = %dir, error = %e, code = e.error_code(), "content download failing");
                let pct = shared
                    .contents
                    .read()
                    .await
                    .get(&dir)
                    .map(|c| c.percentage)
                    .unwrap_or(0);
                shared
                    .set_content_progress(&dir, ContentState::Failing, pct)
                    .await;
            }
        }
    }

    async fn transfer(
        client: &reqwest::Client,
        shared: &EngineShared,
        dir: &str,
        descriptor: &ContentDescriptor,
    ) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let target = std::path::Path::new(dir).join(&descriptor.media_file_name);

        let response = client
            .get(descriptor.url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::ContentFetch {
                url: descriptor.url.to_string(),
                source: e,
            })?;

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(&target).await?;
        let mut downloaded: u64 = 0;
        let mut last_pct: u8 = 0;

        shared
            .set_content_progress(dir, ContentState::Downloading, 0)
            .await;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::ContentFetch {
                url: descriptor.url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total {
                if total > 0 {
                    // Hold 100 back for the terminal event
                    let pct = ((downloaded * 100 / total) as u8).min(99);
                    if pct != last_pct {
                        last_pct = pct;
                        shared
                            .set_content_progress(dir, ContentState::Downloading, pct)
                            .await;
                    }
                }
            }
        }

        file.sync_all().await?;
        debug!(path = %dir, bytes = downloaded, "transfer finished");
        Ok(())
    }
}

impl Default for HttpDownloadEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DownloadEngine for HttpDownloadEngine {
    async fn query_status(&self) -> Result<DownloadStatus> {
        let state = *self.shared.state.read().await;
        let paths = self.shared.contents.read().await.keys().cloned().collect();
        Ok(DownloadStatus { state, paths })
    }

    async fn query_content_status(&self, path: &str) -> Result<ContentStatus> {
        let contents = self.shared.contents.read().await;
        let entry = contents.get(path).ok_or_else(|| Error::ContentNotTracked {
            path: path.to_string(),
        })?;
        Ok(ContentStatus::new(path, entry.state, entry.percentage))
    }

    async fn set_constraints(&self, constraints: Constraints) -> Result<()> {
        if constraints.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }
        *self.shared.constraints.write().await = constraints;
        *self.shared.transfer_slots.write().await =
            Arc::new(Semaphore::new(constraints.max_connections as usize));
        debug!(
            max_bandwidth_bps = constraints.max_bandwidth_bps,
            max_connections = constraints.max_connections,
            "constraints updated"
        );
        Ok(())
    }

    #[instrument(skip(self, content))]
    async fn add_content(&self, dir: &str, content: &ContentDescriptor) -> Result<()> {
        let mut contents = self.shared.contents.write().await;
        if contents.contains_key(dir) {
            return Err(Error::engine(format!("content already tracked: {dir}")));
        }

        let handle = tokio::spawn(Self::run_transfer(
            self.client.clone(),
            self.shared.clone(),
            dir.to_string(),
            content.clone(),
        ));

        contents.insert(
            dir.to_string(),
            ContentEntry {
                descriptor: content.clone(),
                state: ContentState::Pending,
                percentage: 0,
                handle: Some(handle),
            },
        );
        drop(contents);

        info!(path = %dir, url = %content.url, "content registered");
        self.shared.broadcast(EngineEvent::Progress(ContentStatus::new(
            dir,
            ContentState::Pending,
            0,
        )));
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        *self.shared.state.write().await = EngineState::Running;
        // send_replace updates the gate even while no transfer task is
        // subscribed yet; plain send would fail without storing the value
        self.shared.running_tx.send_replace(true);
        self.shared.broadcast(EngineEvent::State(EngineState::Running));
        info!("engine resumed");
        Ok(())
    }

    async fn cancel_content(&self, path: &str) -> Result<()> {
        let mut contents = self.shared.contents.write().await;
        let entry = contents.remove(path).ok_or_else(|| Error::ContentNotTracked {
            path: path.to_string(),
        })?;
        if let Some(handle) = entry.handle {
            handle.abort();
        }
        info!(path = %path, media = %entry.descriptor.media_file_name, "content canceled");
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ContentDescriptor {
        ContentDescriptor::new(
            url::Url::parse("http://example.com/stream.mpd").unwrap(),
            SourceType::Dash,
            "media.m4f",
            "subs.vtt",
        )
    }

    #[tokio::test]
    async fn test_engine_starts_paused() {
        let engine = HttpDownloadEngine::new();
        let status = engine.query_status().await.unwrap();
        assert_eq!(status.state, EngineState::Paused);
        assert!(status.paths.is_empty());
    }

    #[tokio::test]
    async fn test_added_content_is_pending_while_paused() {
        let engine = HttpDownloadEngine::new();
        engine.add_content("/tmp/rv-test-dir", &descriptor()).await.unwrap();

        let status = engine.query_content_status("/tmp/rv-test-dir").await.unwrap();
        assert_eq!(status.content_state, ContentState::Pending);
        assert_eq!(status.downloaded_percentage, 0);

        engine.cancel_content("/tmp/rv-test-dir").await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_content_rejected() {
        let engine = HttpDownloadEngine::new();
        engine.add_content("/tmp/rv-dup", &descriptor()).await.unwrap();
        let err = engine.add_content("/tmp/rv-dup", &descriptor()).await.unwrap_err();
        assert_eq!(err.error_code(), "CONTENT_REJECTED");
        engine.cancel_content("/tmp/rv-dup").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_unknown_path() {
        let engine = HttpDownloadEngine::new();
        let err = engine.cancel_content("/nowhere").await.unwrap_err();
        assert_eq!(err.error_code(), "CONTENT_NOT_TRACKED");
    }

    #[tokio::test]
    async fn test_zero_connections_rejected() {
        let engine = HttpDownloadEngine::new();
        let err = engine
            .set_constraints(Constraints {
                max_bandwidth_bps: 0,
                max_connections: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[tokio::test]
    async fn test_resume_before_add_content_still_transfers() {
        let engine = HttpDownloadEngine::new();
        let mut events = engine.subscribe();

        // Sessions resume the engine first and register content after
        engine.resume().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item").to_str().unwrap().to_string();
        let desc = ContentDescriptor::new(
            // Unroutable source: the transfer must still run and terminate
            url::Url::parse("http://127.0.0.1:9/unreachable.m4f").unwrap(),
            SourceType::SingleFile,
            "media.m4f",
            "subs.vtt",
        );
        engine.add_content(&path, &desc).await.unwrap();

        let terminal = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            loop {
                match events.recv().await {
                    Some(EngineEvent::Progress(s))
                        if s.content_state == ContentState::Failing
                            || s.content_state == ContentState::Completed =>
                    {
                        break s.content_state;
                    }
                    Some(_) => {}
                    None => panic!("event channel closed without a terminal state"),
                }
            }
        })
        .await
        .expect("transfer task never reached a terminal state");
        assert_eq!(terminal, ContentState::Failing);
    }

    #[tokio::test]
    async fn test_subscribe_receives_registration_event() {
        let engine = HttpDownloadEngine::new();
        let mut events = engine.subscribe();
        engine.add_content("/tmp/rv-sub", &descriptor()).await.unwrap();

        match events.recv().await {
            Some(EngineEvent::Progress(status)) => {
                assert_eq!(status.path, "/tmp/rv-sub");
                assert_eq!(status.content_state, ContentState::Pending);
            }
            other => panic!("expected progress event, got {other:?}"),
        }
        engine.cancel_content("/tmp/rv-sub").await.unwrap();
    }
}
