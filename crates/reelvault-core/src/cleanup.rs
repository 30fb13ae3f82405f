//! Best-effort cleanup of downloaded media
//!
//! Deletes the descriptor's output files from each candidate directory,
//! then cancels every path the engine still tracks. Nothing here raises:
//! missing files are expected, and engine failures during query or cancel
//! are logged and swallowed. Running cleanup twice is harmless.

use crate::{engine::DownloadEngine, types::ContentDescriptor};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Delete downloaded output files and cancel all tracked content.
#[instrument(skip(engine, descriptor))]
pub async fn cleanup(
    engine: &dyn DownloadEngine,
    descriptor: &ContentDescriptor,
    candidate_dirs: &[&str],
) {
    for dir in candidate_dirs {
        remove_if_present(Path::new(dir).join(&descriptor.media_file_name)).await;
        remove_if_present(Path::new(dir).join(&descriptor.subtitles_file_name)).await;
    }

    let paths = match engine.query_status().await {
        Ok(status) => status.paths,
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "status query failed during cleanup");
            return;
        }
    };

    for path in paths {
        match engine.cancel_content(&path).await {
            Ok(()) => info!(path = %path, "canceled tracked content"),
            Err(e) => warn!(path = %path, error = %e, "cancel failed during cleanup"),
        }
    }
}

async fn remove_if_present(path: std::path::PathBuf) {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!(file = %path.display(), "deleted file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(file = %path.display(), error = %e, "delete failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::types::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use url::Url;

    /// Engine fake that records cancels and optionally fails queries
    struct RecordingEngine {
        paths: Vec<String>,
        fail_query: bool,
        canceled: Mutex<Vec<String>>,
    }

    impl RecordingEngine {
        fn new(paths: &[&str]) -> Self {
            Self {
                paths: paths.iter().map(|s| s.to_string()).collect(),
                fail_query: false,
                canceled: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DownloadEngine for RecordingEngine {
        async fn query_status(&self) -> Result<DownloadStatus> {
            if self.fail_query {
                return Err(Error::StatusQuery("engine offline".to_string()));
            }
            Ok(DownloadStatus {
                state: EngineState::Paused,
                paths: self.paths.clone(),
            })
        }

        async fn query_content_status(&self, path: &str) -> Result<ContentStatus> {
            Ok(ContentStatus::new(path, ContentState::Pending, 0))
        }

        async fn set_constraints(&self, _constraints: Constraints) -> Result<()> {
            Ok(())
        }

        async fn add_content(&self, _dir: &str, _content: &ContentDescriptor) -> Result<()> {
            Ok(())
        }

        async fn resume(&self) -> Result<()> {
            Ok(())
        }

        async fn cancel_content(&self, path: &str) -> Result<()> {
            self.canceled.lock().unwrap().push(path.to_string());
            Ok(())
        }

        fn subscribe(&self) -> mpsc::UnboundedReceiver<crate::engine::EngineEvent> {
            mpsc::unbounded_channel().1
        }
    }

    fn descriptor() -> ContentDescriptor {
        ContentDescriptor::new(
            Url::parse("http://example.com/stream.mpd").unwrap(),
            SourceType::Dash,
            "media.m4f",
            "subs.vtt",
        )
    }

    #[tokio::test]
    async fn test_removes_exactly_the_descriptor_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("media.m4f"), b"media").unwrap();
        std::fs::write(root.join("subs.vtt"), b"subs").unwrap();
        std::fs::write(root.join("unrelated.txt"), b"keep me").unwrap();

        let engine = RecordingEngine::new(&[]);
        cleanup(&engine, &descriptor(), &[root.to_str().unwrap()]).await;

        assert!(!root.join("media.m4f").exists());
        assert!(!root.join("subs.vtt").exists());
        assert!(root.join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn test_cancels_all_tracked_paths() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RecordingEngine::new(&["/downloads/dir1", "/downloads/dir2"]);
        cleanup(&engine, &descriptor(), &[dir.path().to_str().unwrap()]).await;

        let canceled = engine.canceled.lock().unwrap();
        assert_eq!(canceled.as_slice(), ["/downloads/dir1", "/downloads/dir2"]);
    }

    #[tokio::test]
    async fn test_idempotent_on_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RecordingEngine::new(&[]);

        // Second invocation finds nothing to delete and still succeeds
        cleanup(&engine, &descriptor(), &[dir.path().to_str().unwrap()]).await;
        cleanup(&engine, &descriptor(), &[dir.path().to_str().unwrap()]).await;
    }

    #[tokio::test]
    async fn test_engine_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RecordingEngine::new(&["/downloads/dir1"]);
        engine.fail_query = true;

        // Must not panic or propagate
        cleanup(&engine, &descriptor(), &[dir.path().to_str().unwrap()]).await;
        assert!(engine.canceled.lock().unwrap().is_empty());
    }
}
