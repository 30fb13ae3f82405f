//! Core types for ReelVault

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for a download session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall download engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Engine is transferring tracked content
    Running,
    /// Engine is idle; tracked content waits until resumed
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Running => write!(f, "running"),
            EngineState::Paused => write!(f, "paused"),
        }
    }
}

/// Per-path content state as reported by the download engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentState {
    /// Registered but not yet transferring
    Pending,
    /// Transfer in progress
    Downloading,
    /// Transfer finished successfully
    Completed,
    /// Transfer is failing; the engine owns any retry policy
    Failing,
}

impl std::fmt::Display for ContentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentState::Pending => write!(f, "pending"),
            ContentState::Downloading => write!(f, "downloading"),
            ContentState::Completed => write!(f, "completed"),
            ContentState::Failing => write!(f, "failing"),
        }
    }
}

/// Overall engine status: state plus the set of tracked content paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStatus {
    /// Overall engine state
    pub state: EngineState,
    /// Directories currently tracked by the engine
    pub paths: Vec<String>,
}

/// Status of a single tracked content path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStatus {
    /// Directory this content downloads into
    pub path: String,
    /// Current content state
    pub content_state: ContentState,
    /// Completion percentage, 0-100
    pub downloaded_percentage: u8,
}

impl ContentStatus {
    pub fn new(path: impl Into<String>, content_state: ContentState, percentage: u8) -> Self {
        Self {
            path: path.into(),
            content_state,
            downloaded_percentage: percentage.min(100),
        }
    }
}

/// Download constraints handed to the engine before content is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Bandwidth cap in bits per second (0 = uncapped)
    pub max_bandwidth_bps: u64,
    /// Maximum parallel connections
    pub max_connections: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_bandwidth_bps: 20 * 1024 * 1024,
            max_connections: 2,
        }
    }
}

/// Source type of the content being downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Dash,
    Hls,
    SingleFile,
}

impl SourceType {
    /// MIME type announced to the playback proxy for this source
    pub fn content_type(&self) -> &'static str {
        match self {
            SourceType::Dash => "application/dash+xml",
            SourceType::Hls => "application/vnd.apple.mpegurl",
            SourceType::SingleFile => "video/mp4",
        }
    }

    /// Proxy source type for a downloaded local file.
    ///
    /// Manifest formats keep their own proxy handling; anything else is
    /// served as a single file.
    pub fn proxy_source(&self) -> SourceType {
        match self {
            SourceType::Dash | SourceType::Hls => *self,
            _ => SourceType::SingleFile,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Dash => write!(f, "dash"),
            SourceType::Hls => write!(f, "hls"),
            SourceType::SingleFile => write!(f, "single-file"),
        }
    }
}

/// Fixed bundle of parameters identifying what to download.
///
/// Constructed once at session start, immutable thereafter, and passed by
/// reference into both the start-download and cleanup operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDescriptor {
    /// Track identifiers to download (codec/language specific)
    pub tracks: Vec<String>,
    /// Output filename for the subtitle sidecar
    pub subtitles_file_name: String,
    /// Output filename for the media file
    pub media_file_name: String,
    /// Source manifest or media URL
    pub url: Url,
    /// Source type
    pub source_type: SourceType,
}

impl ContentDescriptor {
    /// Create a descriptor with the given source and output names
    pub fn new(
        url: Url,
        source_type: SourceType,
        media_file_name: impl Into<String>,
        subtitles_file_name: impl Into<String>,
    ) -> Self {
        Self {
            tracks: Vec::new(),
            subtitles_file_name: subtitles_file_name.into(),
            media_file_name: media_file_name.into(),
            url,
            source_type,
        }
    }

    /// Add a track selection
    pub fn with_track(mut self, track: impl Into<String>) -> Self {
        self.tracks.push(track.into());
        self
    }

    /// Local file URL of the downloaded media inside `dir`
    pub fn media_file_url(&self, dir: &str) -> String {
        format!("file://{}/{}", dir, self.media_file_name)
    }

    /// Local file URL of the downloaded subtitles inside `dir`
    pub fn subtitle_file_url(&self, dir: &str) -> String {
        format!("file://{}/{}", dir, self.subtitles_file_name)
    }
}

/// Session orchestration phases.
///
/// Replaces the nested-callback flow with an explicit state machine:
/// the session starts fresh or is prompted about a resumable download,
/// drives one download, and hands off to playback at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Initial phase, collaborators not yet engaged
    NotStarted,
    /// A resumable download was found; waiting on the operator's choice
    Prompted,
    /// A download is running (fresh or resumed)
    Downloading,
    /// Playback has been handed to the player
    Playing,
}

impl SessionPhase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (NotStarted, Prompted)
                | (NotStarted, Downloading)
                | (Prompted, Downloading)
                | (Downloading, Playing)
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::NotStarted => write!(f, "not-started"),
            SessionPhase::Prompted => write!(f, "prompted"),
            SessionPhase::Downloading => write!(f, "downloading"),
            SessionPhase::Playing => write!(f, "playing"),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory the tracked download lands in
    pub download_dir: String,
    /// What to download
    pub content: ContentDescriptor,
    /// Engine constraints applied before adding content
    pub constraints: Constraints,
    /// Name of the bundled license token asset
    pub token_asset: String,
    /// Directory handed to the DRM runtime for its key store
    pub drm_store_dir: String,
}

impl SessionConfig {
    pub fn new(download_dir: impl Into<String>, content: ContentDescriptor) -> Self {
        Self {
            download_dir: download_dir.into(),
            content,
            constraints: Constraints::default(),
            token_asset: "license-token.xml".to_string(),
            drm_store_dir: ".drm".to_string(),
        }
    }

    /// Override engine constraints
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Override the license token asset name
    pub fn with_token_asset(mut self, name: impl Into<String>) -> Self {
        self.token_asset = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_phase_transitions() {
        // Valid transitions
        assert!(SessionPhase::NotStarted.can_transition_to(SessionPhase::Prompted));
        assert!(SessionPhase::NotStarted.can_transition_to(SessionPhase::Downloading));
        assert!(SessionPhase::Prompted.can_transition_to(SessionPhase::Downloading));
        assert!(SessionPhase::Downloading.can_transition_to(SessionPhase::Playing));

        // Invalid transitions
        assert!(!SessionPhase::NotStarted.can_transition_to(SessionPhase::Playing));
        assert!(!SessionPhase::Prompted.can_transition_to(SessionPhase::Playing));
        assert!(!SessionPhase::Playing.can_transition_to(SessionPhase::Downloading));
        assert!(!SessionPhase::Downloading.can_transition_to(SessionPhase::NotStarted));
    }

    #[test]
    fn test_source_type_content_types() {
        assert_eq!(SourceType::Dash.content_type(), "application/dash+xml");
        assert_eq!(SourceType::Hls.content_type(), "application/vnd.apple.mpegurl");
        assert_eq!(SourceType::SingleFile.content_type(), "video/mp4");
    }

    #[test]
    fn test_proxy_source_folding() {
        // Manifest formats pass through, a downloaded fragmented file is
        // served as a single file
        assert_eq!(SourceType::Dash.proxy_source(), SourceType::Dash);
        assert_eq!(SourceType::Hls.proxy_source(), SourceType::Hls);
        assert_eq!(SourceType::SingleFile.proxy_source(), SourceType::SingleFile);
    }

    #[test]
    fn test_descriptor_file_urls() {
        let url = Url::parse("http://example.com/stream.mpd").unwrap();
        let desc = ContentDescriptor::new(url, SourceType::Dash, "media.m4f", "subs.vtt");
        assert_eq!(
            desc.media_file_url("/downloads/dir1"),
            "file:///downloads/dir1/media.m4f"
        );
        assert_eq!(
            desc.subtitle_file_url("/downloads/dir1"),
            "file:///downloads/dir1/subs.vtt"
        );
    }

    #[test]
    fn test_default_constraints() {
        let c = Constraints::default();
        assert_eq!(c.max_bandwidth_bps, 20 * 1024 * 1024);
        assert_eq!(c.max_connections, 2);
    }

    #[test]
    fn test_content_status_caps_percentage() {
        let status = ContentStatus::new("/d", ContentState::Downloading, 150);
        assert_eq!(status.downloaded_percentage, 100);
    }
}
