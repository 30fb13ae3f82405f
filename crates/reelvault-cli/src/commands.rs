//! CLI command implementations

use anyhow::{bail, Context};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use reelvault_core::{
    cleanup, ContentDescriptor, Constraints, DirAssetStore, DownloadSession, FixedResumeChoice,
    HttpDownloadEngine, LocalPlaybackProxy, LogPlayer, PersistedDrmRuntime, ProgressSink,
    ResumeChoice, SessionConfig, SessionPhase, SourceType,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::output::{render, OutputFormat};

pub struct DownloadOpts {
    pub url: String,
    pub dir: String,
    pub media_name: String,
    pub subs_name: String,
    pub tracks: Vec<String>,
    pub source: String,
    pub assets: PathBuf,
    pub token: String,
    pub drm_store: String,
    pub max_bandwidth: u64,
    pub connections: u32,
    pub cancel_pending: bool,
}

fn parse_source_type(s: &str) -> anyhow::Result<SourceType> {
    match s.to_lowercase().as_str() {
        "dash" => Ok(SourceType::Dash),
        "hls" => Ok(SourceType::Hls),
        "file" | "single-file" => Ok(SourceType::SingleFile),
        other => bail!("unknown source type '{other}' (expected dash, hls, or file)"),
    }
}

/// Progress surface backed by an indicatif bar
struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% ({eta})")
                .expect("static template")
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn set_progress(&self, percentage: u8) {
        self.bar.set_position(percentage as u64);
    }

    fn notify(&self, message: &str) {
        self.bar.println(format!("{} {}", style(">").cyan(), message));
    }

    fn dismiss(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Run a full download session
pub async fn download(opts: DownloadOpts, _format: &str) -> anyhow::Result<()> {
    let source_type = parse_source_type(&opts.source)?;
    let url = Url::parse(&opts.url).context("invalid source URL")?;

    let mut descriptor =
        ContentDescriptor::new(url, source_type, &opts.media_name, &opts.subs_name);
    for track in &opts.tracks {
        descriptor = descriptor.with_track(track);
    }

    let mut config = SessionConfig::new(&opts.dir, descriptor)
        .with_constraints(Constraints {
            max_bandwidth_bps: opts.max_bandwidth,
            max_connections: opts.connections,
        })
        .with_token_asset(&opts.token);
    config.drm_store_dir = opts.drm_store.clone();

    let choice = if opts.cancel_pending {
        ResumeChoice::Cancel
    } else {
        ResumeChoice::Resume
    };

    let player = Arc::new(LogPlayer::new());
    let session = DownloadSession::new(
        config,
        Arc::new(HttpDownloadEngine::new()),
        Arc::new(PersistedDrmRuntime::new()),
        Arc::new(LocalPlaybackProxy::new()),
        player.clone(),
        Arc::new(DirAssetStore::new(&opts.assets)),
        Arc::new(BarSink::new()),
        Arc::new(FixedResumeChoice(choice)),
    );

    println!("Downloading to {}", opts.dir);
    tracing::info!(session_id = %session.id(), dir = %opts.dir, "session starting");
    let phase = session.start().await?;

    if phase == SessionPhase::Prompted {
        println!("All downloads canceled.");
        return Ok(());
    }

    let phase = session.run_events().await?;
    match phase {
        SessionPhase::Playing => {
            let source = player
                .last_source()
                .await
                .context("player has no source after playback hand-off")?;
            println!("\n{} {}", style("Playback URL:").green().bold(), source);
            Ok(())
        }
        other => bail!("download did not complete (session phase: {other})"),
    }
}

#[derive(Serialize)]
struct FileReport {
    name: String,
    present: bool,
    bytes: u64,
}

#[derive(Serialize)]
struct StatusReport {
    dir: String,
    media: FileReport,
    subtitles: FileReport,
}

fn inspect_file(dir: &Path, name: &str) -> FileReport {
    let path = dir.join(name);
    match std::fs::metadata(&path) {
        Ok(meta) => FileReport {
            name: name.to_string(),
            present: true,
            bytes: meta.len(),
        },
        Err(_) => FileReport {
            name: name.to_string(),
            present: false,
            bytes: 0,
        },
    }
}

/// Inspect a download directory
pub async fn status(
    dir: &str,
    media_name: &str,
    subs_name: &str,
    format: &str,
) -> anyhow::Result<()> {
    let root = Path::new(dir);
    let report = StatusReport {
        dir: dir.to_string(),
        media: inspect_file(root, media_name),
        subtitles: inspect_file(root, subs_name),
    };

    let rendered = render(&report, OutputFormat::from(format), || {
        let mut lines = vec![format!("Download directory: {}", report.dir)];
        for file in [&report.media, &report.subtitles] {
            lines.push(if file.present {
                format!("  {} - {} bytes", file.name, file.bytes)
            } else {
                format!("  {} - absent", file.name)
            });
        }
        lines.join("\n")
    });
    println!("{rendered}");
    Ok(())
}

/// Delete downloaded output files and cancel tracked content
pub async fn cancel(dir: &str, media_name: &str, subs_name: &str) -> anyhow::Result<()> {
    let placeholder = Url::parse("file:///")?;
    let descriptor =
        ContentDescriptor::new(placeholder, SourceType::SingleFile, media_name, subs_name);

    // Fresh engine: nothing tracked, so this clears local files only
    let engine = HttpDownloadEngine::new();
    cleanup(&engine, &descriptor, &[dir]).await;

    println!("Cleaned {}", dir);
    Ok(())
}
