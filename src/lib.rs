//! Self-update and encoder provisioning for the VibeCraft desktop app
//!
//! - [`version`] - release tag comparison
//! - [`download`] - release feed, asset selection, streaming download, zip extraction
//! - [`install`] - backup / replace / rollback of the running executable
//! - [`control`] - delayed, cancellable relaunch
//! - [`encoder`] - on-demand ffmpeg provisioning
//! - [`changelog`] - last-seen-version marker
//! - [`updater`] - the facade tying these together

pub mod changelog;
pub mod config;
pub mod control;
pub mod download;
pub mod encoder;
pub mod error;
pub mod install;
pub mod updater;
pub mod version;

pub use changelog::{ChangelogDecision, VersionMarker};
pub use config::UpdaterConfig;
pub use control::{ProcessRelauncher, RelaunchHandle, RelaunchMode, RelaunchOutcome};
pub use download::{ProgressSink, TransferProgress};
pub use encoder::EncoderProvisioner;
pub use error::{ErrorKind, Result, UpdateError};
pub use updater::{SelfUpdater, UpdateAvailability};
