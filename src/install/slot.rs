//! The running executable's path and its transient `.old` / `.new` siblings

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpdateError};

const BACKUP_SUFFIX: &str = ".old";
const STAGED_SUFFIX: &str = ".new";

/// Canonical executable path plus the backup and staging paths next to it.
///
/// Siblings share the canonical path's directory, so every rename between
/// them stays on one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableSlot {
    exe: PathBuf,
    backup: PathBuf,
    staged: PathBuf,
}

impl ExecutableSlot {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        let exe = exe.into();
        Self {
            backup: with_suffix(&exe, BACKUP_SUFFIX),
            staged: with_suffix(&exe, STAGED_SUFFIX),
            exe,
        }
    }

    /// Slot for the currently running process
    pub fn current() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            UpdateError::io(
                "locate current executable",
                PathBuf::from("<current_exe>"),
                e,
            )
        })?;
        Ok(Self::new(exe))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// `<exe>.old`
    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// `<exe>.new`
    pub fn staged(&self) -> &Path {
        &self.staged
    }

    pub fn dir(&self) -> &Path {
        self.exe.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// `app.exe` + `.old` -> `app.exe.old` (the extension is kept, not replaced)
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
