use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "debridflow")]
#[command(author, version, about = "Debrid download, transcode and library import tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a PVR "On Grab" event from its environment variables
    Grab,

    /// Add a magnet or torrent file to the debrid service, download and import it
    Fetch {
        /// Magnet URI or path to a .torrent file
        #[arg(required = true)]
        source: String,

        /// Download id of the handoff (defaults to the torrent hash)
        #[arg(long)]
        hash: Option<String>,
    },

    /// Import a finished download: transcode, upload, rescan and notify
    Import {
        /// Directory holding the downloaded release
        #[arg(long, alias = "saveDir")]
        save_dir: PathBuf,

        /// Download id the release was grabbed with
        #[arg(long)]
        hash: String,
    },

    /// Probe a media file and display its streams and planned action
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bring a single file to AAC 2.0 / MP4 and extract its subtitles
    Transcode {
        /// File to process
        #[arg(required = true)]
        file: PathBuf,

        /// Show what would be done without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
