//! Resume decision
//!
//! On startup the session asks whether a previously started download is
//! still worth resuming: the engine must be paused and some tracked path
//! under the target directory must still be pending. Anything else (a
//! running engine, completed or failing content, or a failed status
//! query) means a fresh start.

use crate::{
    engine::DownloadEngine,
    types::{ContentState, ContentStatus, DownloadStatus, EngineState},
};
use tracing::{debug, info, warn};

/// Pure resume decision over already-fetched status data.
///
/// Returns true iff the engine is paused AND some tracked path contains
/// `target_dir` AND that path's content is still pending. No side effects.
pub fn is_resumable(
    status: &DownloadStatus,
    content_statuses: &[ContentStatus],
    target_dir: &str,
) -> bool {
    if status.state != EngineState::Paused {
        return false;
    }
    content_statuses.iter().any(|cs| {
        cs.path.contains(target_dir) && cs.content_state == ContentState::Pending
    })
}

/// Query the engine and decide resumability for `target_dir`.
///
/// Any failure of the status query is treated as "no resumable download"
/// so startup fails open toward a fresh download. A failing per-path query
/// skips that path only.
pub async fn probe_resumable(engine: &dyn DownloadEngine, target_dir: &str) -> bool {
    let status = match engine.query_status().await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "status query failed, starting fresh");
            return false;
        }
    };

    let mut content_statuses = Vec::with_capacity(status.paths.len());
    for path in &status.paths {
        match engine.query_content_status(path).await {
            Ok(cs) => {
                debug!(path = %cs.path, state = %cs.content_state, pct = cs.downloaded_percentage, "tracked content");
                content_statuses.push(cs);
            }
            Err(e) => {
                warn!(path = %path, error = %e, "content status query failed, skipping path");
            }
        }
    }

    let resumable = is_resumable(&status, &content_statuses, target_dir);
    if resumable {
        info!(dir = %target_dir, "resumable download found");
    }
    resumable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: EngineState, paths: &[&str]) -> DownloadStatus {
        DownloadStatus {
            state,
            paths: paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_paused_pending_match_is_resumable() {
        let status = status(EngineState::Paused, &["/downloads/dir1"]);
        let contents = [ContentStatus::new("/downloads/dir1", ContentState::Pending, 40)];
        assert!(is_resumable(&status, &contents, "dir1"));
    }

    #[test]
    fn test_running_engine_is_not_resumable() {
        let status = status(EngineState::Running, &["/downloads/dir1"]);
        let contents = [ContentStatus::new("/downloads/dir1", ContentState::Pending, 40)];
        assert!(!is_resumable(&status, &contents, "dir1"));
    }

    #[test]
    fn test_non_pending_content_is_not_resumable() {
        let status = status(EngineState::Paused, &["/downloads/dir1"]);
        for state in [
            ContentState::Downloading,
            ContentState::Completed,
            ContentState::Failing,
        ] {
            let contents = [ContentStatus::new("/downloads/dir1", state, 40)];
            assert!(!is_resumable(&status, &contents, "dir1"), "state {state}");
        }
    }

    #[test]
    fn test_other_directory_is_not_resumable() {
        let status = status(EngineState::Paused, &["/downloads/dir2"]);
        let contents = [ContentStatus::new("/downloads/dir2", ContentState::Pending, 40)];
        assert!(!is_resumable(&status, &contents, "dir1"));
    }

    #[test]
    fn test_any_matching_path_suffices() {
        let status = status(EngineState::Paused, &["/a", "/downloads/dir1"]);
        let contents = [
            ContentStatus::new("/a", ContentState::Completed, 100),
            ContentStatus::new("/downloads/dir1", ContentState::Pending, 10),
        ];
        assert!(is_resumable(&status, &contents, "dir1"));
    }

    #[test]
    fn test_no_tracked_content() {
        let status = status(EngineState::Paused, &[]);
        assert!(!is_resumable(&status, &[], "dir1"));
    }
}
