//! How a downloaded artifact becomes the executable at the canonical path
//!
//! Selected once per installer: Windows releases ship a zip holding the
//! `.exe`, everything else ships the bare binary.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::debug;

use super::slot::ExecutableSlot;
use crate::download::extract::{extract_first_matching, is_exe_entry, set_executable};
use crate::error::{Result, UpdateError};

/// Places a new binary at `slot.exe()`.
///
/// Called only after the previous binary has been renamed to
/// `slot.backup()`, so the canonical path is free. Any error triggers a
/// rollback in the installer.
pub trait ReplaceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn replace(&self, artifact: &Path, slot: &ExecutableSlot) -> Result<()>;
}

/// Strategy for the host this binary was built for
pub fn for_host() -> Box<dyn ReplaceStrategy> {
    if cfg!(windows) {
        Box::new(ZipExeStrategy)
    } else {
        Box::new(DirectCopyStrategy)
    }
}

/// Extract the first `*.exe` entry to `<exe>.new`, then rename it onto `<exe>`
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExeStrategy;

impl ReplaceStrategy for ZipExeStrategy {
    fn name(&self) -> &'static str {
        "zip-exe"
    }

    fn replace(&self, artifact: &Path, slot: &ExecutableSlot) -> Result<()> {
        extract_first_matching(artifact, slot.staged(), is_exe_entry, "*.exe")?;
        debug!(
            "Staged {} from {}",
            slot.staged().display(),
            artifact.display()
        );

        std::fs::rename(slot.staged(), slot.exe())
            .map_err(|e| UpdateError::io("move staged executable into place", slot.exe(), e))
    }
}

/// Copy the artifact's bytes onto a fresh file at `<exe>` and chmod 0755
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectCopyStrategy;

impl ReplaceStrategy for DirectCopyStrategy {
    fn name(&self) -> &'static str {
        "direct-copy"
    }

    fn replace(&self, artifact: &Path, slot: &ExecutableSlot) -> Result<()> {
        let mut src =
            File::open(artifact).map_err(|e| UpdateError::io("open update artifact", artifact, e))?;
        let mut dst = File::create(slot.exe())
            .map_err(|e| UpdateError::io("create executable", slot.exe(), e))?;

        io::copy(&mut src, &mut dst)
            .map_err(|e| UpdateError::io("copy update artifact", slot.exe(), e))?;
        dst.flush()
            .map_err(|e| UpdateError::io("flush executable", slot.exe(), e))?;
        dst.sync_all()
            .map_err(|e| UpdateError::io("sync executable", slot.exe(), e))?;
        drop(dst);

        set_executable(slot.exe())
    }
}
