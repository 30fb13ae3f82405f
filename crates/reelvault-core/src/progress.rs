//! Progress handling and the playback trigger
//!
//! Reacts to engine progress notifications for one tracked directory:
//! keeps a progress indicator current, surfaces milestone and failure
//! notifications, and hands the finished download to the player exactly
//! once.
//!
//! Playback is gated on the reported percentage reaching 100, not on the
//! `Completed` enum state. Engines have been observed reporting 100%
//! slightly before flipping the state, and the two signals are kept
//! decoupled on purpose.

use crate::{
    proxy::{MediaSourceParams, PlaybackProxy, Player},
    types::{ContentDescriptor, ContentState, ContentStatus},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Percentage at which playback of the downloaded content starts
const PLAYBACK_START_PERCENTAGE: u8 = 100;

/// Interval between transient progress notifications, in percent
const MILESTONE_STEP: u8 = 20;

/// User-facing progress surface.
///
/// Implementations are invoked from the session's event pump, a single
/// serialized context; they marshal to their own UI thread if they have
/// one.
pub trait ProgressSink: Send + Sync {
    /// Update the progress indicator for the tracked download
    fn set_progress(&self, percentage: u8);

    /// Surface a transient, user-visible notification
    fn notify(&self, message: &str);

    /// Dismiss the progress indicator
    fn dismiss(&self);
}

/// Reactive handler over progress notifications for one tracked directory.
///
/// The engine drives all state transitions; this type only observes them
/// and owns the at-most-once playback hand-off.
pub struct ProgressHandler {
    tracked_dir: String,
    descriptor: ContentDescriptor,
    sink: Arc<dyn ProgressSink>,
    proxy: Arc<dyn PlaybackProxy>,
    player: Arc<dyn Player>,
    /// Set once playback has been handed off; guards against duplicate
    /// triggers from repeated 100% notifications. Only the event pump
    /// writes it, the atomic is for cross-thread visibility.
    playback_started: AtomicBool,
}

impl ProgressHandler {
    pub fn new(
        tracked_dir: impl Into<String>,
        descriptor: ContentDescriptor,
        sink: Arc<dyn ProgressSink>,
        proxy: Arc<dyn PlaybackProxy>,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            tracked_dir: tracked_dir.into(),
            descriptor,
            sink,
            proxy,
            player,
            playback_started: AtomicBool::new(false),
        }
    }

    /// Whether playback has already been handed to the player
    pub fn playback_started(&self) -> bool {
        self.playback_started.load(Ordering::Acquire)
    }

    /// React to one progress notification.
    ///
    /// Returns true when this notification triggered the playback
    /// hand-off.
    pub async fn handle(&self, status: &ContentStatus) -> bool {
        let pct = status.downloaded_percentage;
        let tracked = status.path.contains(&self.tracked_dir);

        if status.content_state == ContentState::Failing {
            warn!(path = %status.path, "media download failing");
            self.sink
                .notify(&format!("Media download failing: {}", status.path));
        }

        if tracked {
            self.sink.set_progress(pct);
        }

        if pct % MILESTONE_STEP == 0 && pct > 0 && pct < 100 {
            info!(path = %status.path, pct = pct, "download milestone");
            self.sink.notify(&format!(
                "Media download on {} : {}% complete",
                status.path, pct
            ));
        }

        if status.content_state == ContentState::Completed {
            info!(path = %status.path, "media download complete");
            self.sink.dismiss();
            self.sink
                .notify(&format!("Media download complete on: {}", status.path));
        }

        if pct == PLAYBACK_START_PERCENTAGE && tracked && !self.playback_started() {
            if self.start_playback(&status.path).await {
                self.playback_started.store(true, Ordering::Release);
                return true;
            }
        }

        false
    }

    /// Build the playback URL for the downloaded media and hand it to the
    /// player. Errors are logged and leave the player unset; the caller's
    /// started flag stays clear so a later notification may retry.
    async fn start_playback(&self, path: &str) -> bool {
        let file_url = self.descriptor.media_file_url(path);
        let subtitle_url = self.descriptor.subtitle_file_url(path);
        let source_type = self.descriptor.source_type.proxy_source();

        let params =
            MediaSourceParams::for_source(self.descriptor.source_type).with_subtitles(subtitle_url);

        let playable = match self.proxy.make_url(&file_url, source_type, &params).await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "playback url construction failed");
                return false;
            }
        };

        match self.player.prepare(playable.clone()).await {
            Ok(()) => {
                info!(source = %playable, "playback started");
                self.sink.dismiss();
                true
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "player rejected source");
                false
            }
        }
    }
}
