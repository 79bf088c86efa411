use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "VibeCraft self-updater and encoder provisioner")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Check whether a newer release exists (Exit 0 either way)
    Check,
    /// Show the latest release and its notes
    Info,
    /// Download an update artifact into the download directory
    Download { url: String },
    /// Replace the current executable with a downloaded artifact
    Install {
        artifact: PathBuf,

        /// Restart the application once the install succeeded
        #[arg(long)]
        relaunch: bool,
    },
    /// Check, download and install in one go
    Update {
        #[arg(long)]
        relaunch: bool,
    },
    /// Manage the ffmpeg encoder
    Encoder {
        #[command(subcommand)]
        action: EncoderCmd,
    },
    /// Restore an interrupted install and clear stale downloads
    Reconcile,
    /// Last-seen-version marker
    Changelog {
        #[command(subcommand)]
        action: ChangelogCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum EncoderCmd {
    /// Report whether the encoder is installed (Exit 0 = installed, 1 = missing)
    Status,
    /// Download and install the encoder for this platform
    Install,
    /// Convert a WebM recording to MP4
    Convert { input: PathBuf, output: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ChangelogCmd {
    /// Whether the changelog should be shown for this version
    Status,
    /// Record the current version as seen
    MarkSeen,
}
