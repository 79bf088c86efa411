//! Error taxonomy for release checks, downloads, installs and encoder provisioning
//!
//! Every variant carries enough context (operation, path, cause) to be logged
//! verbatim by the caller. Nothing in this crate retries on error.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors produced by the update and provisioning flows
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Transport failure: DNS, connect, TLS, timeout, truncated body
    #[error("network error during {operation}: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Server answered with anything other than 200
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Release feed payload could not be decoded
    #[error("failed to decode release feed from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no release asset matches platform '{platform}' (assets: {available})")]
    NoMatchingAsset { platform: String, available: String },

    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("{wanted} not found in archive {}", archive.display())]
    BinaryNotFoundInArchive { archive: PathBuf, wanted: String },

    /// Renaming the running executable aside failed; nothing was changed
    #[error(
        "failed to back up {} to {}: {source}",
        exe.display(),
        backup.display()
    )]
    BackupFailed {
        exe: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replacement failed and the previous executable was restored
    #[error(
        "failed to install update at {}: {reason} (previous version restored)",
        exe.display()
    )]
    InstallFailed { exe: PathBuf, reason: String },

    /// Replacement failed and restoring the backup failed too
    #[error(
        "ROLLBACK FAILED for {}: install error: {install_error}; restore of {} failed: {source}. \
         The executable may be missing or corrupt",
        exe.display(),
        backup.display()
    )]
    RollbackFailed {
        exe: PathBuf,
        backup: PathBuf,
        install_error: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "encoder install could not be verified at {}: {reason}",
        path.display()
    )]
    InstallVerificationFailed { path: PathBuf, reason: String },

    #[error("encoding {} failed: {reason}", input.display())]
    EncodeFailed { input: PathBuf, reason: String },

    #[error("another install is already running for {}", exe.display())]
    InstallInProgress { exe: PathBuf },

    #[error(
        "relaunch of {} failed, please restart manually: {reason}",
        exe.display()
    )]
    RelaunchFailed { exe: PathBuf, reason: String },

    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Fieldless discriminant of [`UpdateError`] for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http,
    Decode,
    NoMatchingAsset,
    UnsupportedPlatform,
    BinaryNotFoundInArchive,
    BackupFailed,
    InstallFailed,
    RollbackFailed,
    InstallVerificationFailed,
    EncodeFailed,
    InstallInProgress,
    RelaunchFailed,
    Io,
    Config,
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::NoMatchingAsset { .. } => ErrorKind::NoMatchingAsset,
            Self::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            Self::BinaryNotFoundInArchive { .. } => ErrorKind::BinaryNotFoundInArchive,
            Self::BackupFailed { .. } => ErrorKind::BackupFailed,
            Self::InstallFailed { .. } => ErrorKind::InstallFailed,
            Self::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            Self::InstallVerificationFailed { .. } => ErrorKind::InstallVerificationFailed,
            Self::EncodeFailed { .. } => ErrorKind::EncodeFailed,
            Self::InstallInProgress { .. } => ErrorKind::InstallInProgress,
            Self::RelaunchFailed { .. } => ErrorKind::RelaunchFailed,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// True when the executable slot may be left without a working binary
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }

    pub(crate) fn network<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            operation,
            source: Box::new(source),
        }
    }

    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
