//! Startup repair of state left behind by an interrupted install or download

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::slot::ExecutableSlot;
use crate::error::{Result, UpdateError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `.old` was renamed back because the canonical path was empty
    pub restored_backup: bool,
    pub removed: Vec<PathBuf>,
}

/// Bring the slot back to "exactly one binary at the canonical path".
///
/// - canonical missing, `.old` present: a crash hit between backup and
///   install, so the backup is restored
/// - otherwise stale `.old` / `.new` siblings are deleted
///
/// Must not run while an install on the same slot is in flight.
pub fn reconcile_slot(slot: &ExecutableSlot) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    if !slot.exe().exists() && slot.backup().exists() {
        std::fs::rename(slot.backup(), slot.exe())
            .map_err(|e| UpdateError::io("restore backup executable", slot.exe(), e))?;
        info!("Restored {} from interrupted install", slot.exe().display());
        report.restored_backup = true;
    }

    for stale in [slot.backup(), slot.staged()] {
        if remove_stale(stale) {
            report.removed.push(stale.to_path_buf());
        }
    }

    Ok(report)
}

/// Remove every regular file in a dedicated download directory.
///
/// Returns the removed paths; a missing directory is not an error.
pub fn sweep_downloads(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(UpdateError::io("read download directory", dir, e)),
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) && remove_stale(&path) {
            removed.push(path);
        }
    }
    Ok(removed)
}

fn remove_stale(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Could not remove stale {}: {e}", path.display());
            false
        }
    }
}
