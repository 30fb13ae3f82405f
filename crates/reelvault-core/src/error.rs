//! Error types for ReelVault Core

use thiserror::Error;

/// Result type alias for download/playback orchestration
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestration error types
#[derive(Error, Debug)]
pub enum Error {
    // DRM runtime errors
    #[error("DRM runtime initialization failed: {0}")]
    RuntimeInit(String),

    #[error("Personalization failed: {0}")]
    Personalization(String),

    #[error("License acquisition failed: {0}")]
    LicenseAcquisition(String),

    #[error("License token not found: {name}")]
    TokenNotFound { name: String },

    // Download engine errors
    #[error("Engine status query failed: {0}")]
    StatusQuery(String),

    #[error("Content not tracked by engine: {path}")]
    ContentNotTracked { path: String },

    #[error("Failed to fetch content: {url}")]
    ContentFetch { url: String, source: reqwest::Error },

    #[error("Engine rejected content: {0}")]
    ContentRejected(String),

    // Playback errors
    #[error("Playback proxy error: {0}")]
    PlaybackProxy(String),

    #[error("Invalid session phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: String, to: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a DRM error
    pub fn drm(msg: impl Into<String>) -> Self {
        Error::LicenseAcquisition(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::ContentRejected(msg.into())
    }

    /// Returns true if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ContentFetch { .. } | Error::StatusQuery(_) | Error::Network(_)
        )
    }

    /// Returns the error code for logs and reports
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::RuntimeInit(_) => "RUNTIME_INIT",
            Error::Personalization(_) => "PERSONALIZATION",
            Error::LicenseAcquisition(_) => "LICENSE_ACQUIRE",
            Error::TokenNotFound { .. } => "TOKEN_NOT_FOUND",
            Error::StatusQuery(_) => "STATUS_QUERY",
            Error::ContentNotTracked { .. } => "CONTENT_NOT_TRACKED",
            Error::ContentFetch { .. } => "CONTENT_FETCH",
            Error::ContentRejected(_) => "CONTENT_REJECTED",
            Error::PlaybackProxy(_) => "PLAYBACK_PROXY",
            Error::InvalidPhaseTransition { .. } => "INVALID_PHASE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
        }
    }
}
