//! ReelVault Core - Offline Download & Playback Orchestration
//!
//! This crate coordinates the flow around an opaque media download
//! engine, DRM runtime, and playback proxy:
//! - Startup probing for a resumable paused download
//! - DRM license acquisition from a bundled token
//! - Best-effort cleanup of stale downloads
//! - Progress-driven playback hand-off (at most once per session)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ReelVault Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Resume    │  │   Cleanup    │  │   Progress   │           │
//! │  │    Probe     │  │  Operation   │  │   Handler    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Download   │                              │
//! │                    │  Session    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │     DRM      │  │  Download   │  │   Playback   │            │
//! │  │   Runtime    │  │   Engine    │  │    Proxy     │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The bottom row are capability traits: the substantive work (download
//! scheduling, license cryptography, adaptive playback) belongs to the
//! engines behind them. Reference implementations are bundled so the
//! workspace runs end to end without external SDKs.

pub mod assets;
pub mod cleanup;
pub mod drm;
pub mod engine;
pub mod error;
pub mod progress;
pub mod proxy;
pub mod resume;
pub mod session;
pub mod types;

pub use assets::{AssetStore, DirAssetStore};
pub use cleanup::cleanup;
pub use drm::{DrmRuntime, License, PersistedDrmRuntime};
pub use engine::{DownloadEngine, EngineEvent, HttpDownloadEngine};
pub use error::{Error, Result};
pub use progress::{ProgressHandler, ProgressSink};
pub use proxy::{LocalPlaybackProxy, LogPlayer, MediaSourceParams, PlaybackProxy, Player};
pub use resume::{is_resumable, probe_resumable};
pub use session::{DownloadSession, FixedResumeChoice, ResumeChoice, ResumePrompt};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
