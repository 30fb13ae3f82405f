//! ReelVault CLI - Headless Offline Download Driver
//!
//! Features:
//! - End-to-end download sessions (license, download, playback URL)
//! - Resume-or-cancel handling for pending downloads
//! - Local download inspection
//! - Best-effort cleanup

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// ReelVault CLI - offline media download toolkit
#[derive(Parser)]
#[command(name = "reelvault")]
#[command(version)]
#[command(about = "Offline DRM download and playback driver", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a download session: acquire a license, download, print the
    /// playback URL
    Download {
        /// Source manifest or media URL
        url: String,

        /// Directory the download lands in
        #[arg(short, long, default_value = "downloads/dlDirectory1")]
        dir: String,

        /// Output filename for the media file
        #[arg(long, default_value = "mydownload-media.m4f")]
        media_name: String,

        /// Output filename for the subtitle sidecar
        #[arg(long, default_value = "mydownload-subtitles.vtt")]
        subs_name: String,

        /// Track identifier to download (repeatable)
        #[arg(short, long)]
        track: Vec<String>,

        /// Source type (dash, hls, file)
        #[arg(short, long, default_value = "dash")]
        source: String,

        /// Directory holding bundled assets
        #[arg(long, default_value = "assets")]
        assets: PathBuf,

        /// License token asset name
        #[arg(long, default_value = "license-token.xml")]
        token: String,

        /// DRM runtime store directory
        #[arg(long, default_value = ".drm")]
        drm_store: String,

        /// Bandwidth cap in bits per second (0 = uncapped)
        #[arg(long, default_value = "20971520")]
        max_bandwidth: u64,

        /// Maximum parallel connections
        #[arg(long, default_value = "2")]
        connections: u32,

        /// Cancel a pending download instead of resuming it
        #[arg(long)]
        cancel_pending: bool,
    },

    /// Inspect a download directory
    Status {
        /// Download directory to inspect
        #[arg(short, long, default_value = "downloads/dlDirectory1")]
        dir: String,

        /// Media filename to look for
        #[arg(long, default_value = "mydownload-media.m4f")]
        media_name: String,

        /// Subtitle filename to look for
        #[arg(long, default_value = "mydownload-subtitles.vtt")]
        subs_name: String,
    },

    /// Delete downloaded output files from a directory
    Cancel {
        /// Download directory to clean
        #[arg(short, long, default_value = "downloads/dlDirectory1")]
        dir: String,

        /// Media filename to delete
        #[arg(long, default_value = "mydownload-media.m4f")]
        media_name: String,

        /// Subtitle filename to delete
        #[arg(long, default_value = "mydownload-subtitles.vtt")]
        subs_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    match cli.command {
        Commands::Download {
            url,
            dir,
            media_name,
            subs_name,
            track,
            source,
            assets,
            token,
            drm_store,
            max_bandwidth,
            connections,
            cancel_pending,
        } => {
            let opts = commands::DownloadOpts {
                url,
                dir,
                media_name,
                subs_name,
                tracks: track,
                source,
                assets,
                token,
                drm_store,
                max_bandwidth,
                connections,
                cancel_pending,
            };
            commands::download(opts, &cli.format).await?;
        }
        Commands::Status {
            dir,
            media_name,
            subs_name,
        } => {
            commands::status(&dir, &media_name, &subs_name, &cli.format).await?;
        }
        Commands::Cancel {
            dir,
            media_name,
            subs_name,
        } => {
            commands::cancel(&dir, &media_name, &subs_name).await?;
        }
    }

    Ok(())
}
