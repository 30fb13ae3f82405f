//! Download session - startup orchestration
//!
//! Drives the whole offline-playback flow in order: DRM runtime bring-up,
//! license acquisition from a bundled token, playback proxy start, the
//! resume-or-fresh decision, and the event pump that feeds engine
//! notifications into the progress handler. Collaborators are injected as
//! capability traits, so the session runs identically against external
//! SDKs and test fakes.
//!
//! Any failure during startup aborts the remaining steps and propagates;
//! no rollback is attempted.

use crate::{
    assets::AssetStore,
    cleanup::cleanup,
    drm::DrmRuntime,
    engine::{DownloadEngine, EngineEvent},
    error::{Error, Result},
    progress::{ProgressHandler, ProgressSink},
    proxy::{PlaybackProxy, Player},
    resume::probe_resumable,
    types::{ContentState, SessionConfig, SessionId, SessionPhase},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, instrument, warn};

/// Operator's answer to the resume prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    /// Continue the pending download
    Resume,
    /// Clear all downloads and stop
    Cancel,
}

/// Source of the resume-or-cancel decision when a resumable download is
/// found at startup
#[async_trait]
pub trait ResumePrompt: Send + Sync {
    async fn choose(&self, dir: &str) -> ResumeChoice;
}

/// A [`ResumePrompt`] with a fixed answer
pub struct FixedResumeChoice(pub ResumeChoice);

#[async_trait]
impl ResumePrompt for FixedResumeChoice {
    async fn choose(&self, _dir: &str) -> ResumeChoice {
        self.0
    }
}

/// Download session orchestrating one tracked content directory
pub struct DownloadSession {
    /// Unique session ID
    id: SessionId,
    config: SessionConfig,
    engine: Arc<dyn DownloadEngine>,
    drm: Arc<dyn DrmRuntime>,
    proxy: Arc<dyn PlaybackProxy>,
    assets: Arc<dyn AssetStore>,
    prompt: Arc<dyn ResumePrompt>,
    handler: ProgressHandler,
    phase: RwLock<SessionPhase>,
    /// Subscribed at construction so events emitted while `start()` is
    /// still running are buffered for the pump instead of dropped
    events: std::sync::Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,
}

impl DownloadSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SessionConfig,
        engine: Arc<dyn DownloadEngine>,
        drm: Arc<dyn DrmRuntime>,
        proxy: Arc<dyn PlaybackProxy>,
        player: Arc<dyn Player>,
        assets: Arc<dyn AssetStore>,
        sink: Arc<dyn ProgressSink>,
        prompt: Arc<dyn ResumePrompt>,
    ) -> Self {
        let handler = ProgressHandler::new(
            config.download_dir.clone(),
            config.content.clone(),
            sink,
            proxy.clone(),
            player,
        );
        let events = engine.subscribe();
        Self {
            id: SessionId::new(),
            config,
            engine,
            drm,
            proxy,
            assets,
            prompt,
            handler,
            phase: RwLock::new(SessionPhase::NotStarted),
            events: std::sync::Mutex::new(Some(events)),
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current orchestration phase
    pub async fn phase(&self) -> SessionPhase {
        *self.phase.read().await
    }

    /// Progress handler backing this session
    pub fn handler(&self) -> &ProgressHandler {
        &self.handler
    }

    /// Transition to a new phase, enforcing the validity table
    async fn set_phase(&self, next: SessionPhase) -> Result<()> {
        let current = *self.phase.read().await;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidPhaseTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        *self.phase.write().await = next;
        info!(from = %current, to = %next, "phase transition");
        Ok(())
    }

    /// Run the startup sequence.
    ///
    /// DRM bring-up and license acquisition come first and block the rest;
    /// both are long calls in real runtimes and run here on the session's
    /// async context, never on anything interactive. Returns the phase the
    /// session settled in: `Downloading` for a fresh or resumed download,
    /// `Prompted` when the operator chose to cancel.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn start(&self) -> Result<SessionPhase> {
        self.drm.initialize(&self.config.drm_store_dir).await?;

        if !self.drm.is_personalized().await? {
            self.drm.personalize().await?;
        }

        let token = self.assets.read_text(&self.config.token_asset).await?;

        let acquire_start = Instant::now();
        let license = self.drm.process_service_token(&token).await?;
        info!(
            license_id = %license.id,
            elapsed_ms = acquire_start.elapsed().as_millis() as u64,
            "license acquired"
        );

        self.proxy.start().await?;

        let dir = self.config.download_dir.clone();
        if probe_resumable(self.engine.as_ref(), &dir).await {
            self.set_phase(SessionPhase::Prompted).await?;
            match self.prompt.choose(&dir).await {
                ResumeChoice::Resume => {
                    info!(dir = %dir, "resuming pending download");
                    self.engine.resume().await?;
                    self.set_phase(SessionPhase::Downloading).await?;
                }
                ResumeChoice::Cancel => {
                    info!(dir = %dir, "operator canceled pending downloads");
                    cleanup(self.engine.as_ref(), &self.config.content, &[&dir]).await;
                }
            }
        } else {
            // Clear any stale output before starting fresh
            cleanup(self.engine.as_ref(), &self.config.content, &[&dir]).await;

            self.engine.set_constraints(self.config.constraints).await?;
            self.engine.resume().await?;
            self.engine.add_content(&dir, &self.config.content).await?;
            self.set_phase(SessionPhase::Downloading).await?;
        }

        Ok(self.phase().await)
    }

    /// Pump engine notifications into the progress handler.
    ///
    /// All sink and player side effects happen on this task, which keeps
    /// the notification handling confined to one serialized context. The
    /// receiver was subscribed at construction, so events that fired
    /// during `start()` are waiting here. Returns when playback has been
    /// handed off, when the tracked content reports failing, or when the
    /// engine closes the channel. Can be called once per session.
    pub async fn run_events(&self) -> Result<SessionPhase> {
        let mut events = self
            .events
            .lock()
            .expect("event receiver lock poisoned")
            .take()
            .ok_or_else(|| Error::Internal("event pump already consumed".to_string()))?;

        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::State(state) => {
                    info!(state = %state, "engine state update");
                }
                EngineEvent::Progress(status) => {
                    let started = self.handler.handle(&status).await;
                    if started {
                        self.set_phase(SessionPhase::Playing).await?;
                        break;
                    }
                    if status.content_state == ContentState::Failing
                        && status.path.contains(&self.config.download_dir)
                    {
                        warn!(path = %status.path, "tracked download failing, stopping event pump");
                        break;
                    }
                }
            }
        }

        Ok(self.phase().await)
    }
}
