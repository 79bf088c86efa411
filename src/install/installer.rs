//! In-place executable replacement with a single backup generation
//!
//! ```text
//! Idle --rename exe->.old--> BackedUp --strategy--> Installed --cleanup--> CleanedUp
//!                               |
//!                               +--strategy failed, rename .old->exe--> RolledBack
//! ```
//!
//! At every rest point the canonical path holds either the old or the new
//! binary. The only exception is a failed rollback, reported as
//! [`UpdateError::RollbackFailed`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::reconcile::{ReconcileReport, reconcile_slot};
use super::slot::ExecutableSlot;
use super::strategy::{self, ReplaceStrategy};
use crate::error::{Result, UpdateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    BackedUp,
    Installed,
    CleanedUp,
    RolledBack,
}

/// What a successful install did
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub exe: PathBuf,
    pub strategy: &'static str,
    pub transitions: Vec<InstallState>,
    /// Files cleanup could not remove (e.g. a locked `.old` on Windows)
    pub leftovers: Vec<PathBuf>,
}

/// Replaces executables using one [`ReplaceStrategy`].
///
/// Installs through the same installer are single-flight: a second call
/// while one is running fails with [`UpdateError::InstallInProgress`]
/// instead of interleaving renames. Separate installers (or processes)
/// targeting the same path must be serialised by the caller.
pub struct AtomicInstaller {
    strategy: Arc<dyn ReplaceStrategy>,
    in_flight: Arc<Mutex<()>>,
}

impl AtomicInstaller {
    pub fn for_host() -> Self {
        Self::with_strategy(strategy::for_host())
    }

    pub fn with_strategy(strategy: Box<dyn ReplaceStrategy>) -> Self {
        Self {
            strategy: Arc::from(strategy),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Replace `slot.exe()` with `artifact`; the artifact is removed on success.
    ///
    /// The single-flight guard moves into the blocking task, so dropping
    /// this future does not release it while renames are still running.
    pub async fn install(&self, artifact: &Path, slot: &ExecutableSlot) -> Result<InstallReport> {
        let guard = self.acquire(slot)?;

        let strategy = Arc::clone(&self.strategy);
        let artifact = artifact.to_path_buf();
        let task_slot = slot.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            run_install(strategy.as_ref(), &artifact, &task_slot)
        })
        .await
        .map_err(|e| UpdateError::InstallFailed {
            exe: slot.exe().to_path_buf(),
            reason: format!("install task aborted: {e}"),
        })?
    }

    /// Startup repair of `slot`, refused while an install is running
    pub async fn reconcile(&self, slot: &ExecutableSlot) -> Result<ReconcileReport> {
        let guard = self.acquire(slot)?;

        let task_slot = slot.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            reconcile_slot(&task_slot)
        })
        .await
        .map_err(|e| UpdateError::InstallFailed {
            exe: slot.exe().to_path_buf(),
            reason: format!("reconcile task aborted: {e}"),
        })?
    }

    /// True while an install or reconcile holds the slot
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    fn acquire(&self, slot: &ExecutableSlot) -> Result<OwnedMutexGuard<()>> {
        Arc::clone(&self.in_flight)
            .try_lock_owned()
            .map_err(|_| UpdateError::InstallInProgress {
                exe: slot.exe().to_path_buf(),
            })
    }
}

/// The state machine itself; blocking filesystem calls only
pub fn run_install(
    strategy: &dyn ReplaceStrategy,
    artifact: &Path,
    slot: &ExecutableSlot,
) -> Result<InstallReport> {
    let mut transitions = vec![InstallState::Idle];
    info!(
        "Installing {} over {} ({})",
        artifact.display(),
        slot.exe().display(),
        strategy.name()
    );

    // Idle -> BackedUp. Same-directory rename: atomic, and processes already
    // running the old image keep their inode.
    std::fs::rename(slot.exe(), slot.backup()).map_err(|source| UpdateError::BackupFailed {
        exe: slot.exe().to_path_buf(),
        backup: slot.backup().to_path_buf(),
        source,
    })?;
    transitions.push(InstallState::BackedUp);
    info!(
        "Backed up {} to {}",
        slot.exe().display(),
        slot.backup().display()
    );

    // BackedUp -> Installed, or -> RolledBack
    if let Err(install_err) = strategy.replace(artifact, slot) {
        warn!(
            "Replace step failed: {install_err}; restoring {}",
            slot.backup().display()
        );
        return Err(roll_back(slot, install_err));
    }
    transitions.push(InstallState::Installed);
    info!("Installed new executable at {}", slot.exe().display());

    // Installed -> CleanedUp; failures here don't touch the installed binary
    let mut leftovers = Vec::new();
    for path in [slot.backup(), slot.staged(), artifact] {
        if let Some(left) = remove_if_present(path) {
            leftovers.push(left);
        }
    }
    transitions.push(InstallState::CleanedUp);

    Ok(InstallReport {
        exe: slot.exe().to_path_buf(),
        strategy: strategy.name(),
        transitions,
        leftovers,
    })
}

fn roll_back(slot: &ExecutableSlot, install_err: UpdateError) -> UpdateError {
    let _ = remove_if_present(slot.staged());

    match std::fs::rename(slot.backup(), slot.exe()) {
        Ok(()) => {
            info!(
                "Rolled back to previous executable at {}",
                slot.exe().display()
            );
            UpdateError::InstallFailed {
                exe: slot.exe().to_path_buf(),
                reason: install_err.to_string(),
            }
        }
        Err(source) => {
            error!(
                "ROLLBACK FAILED: could not restore {} to {}: {source}",
                slot.backup().display(),
                slot.exe().display()
            );
            UpdateError::RollbackFailed {
                exe: slot.exe().to_path_buf(),
                backup: slot.backup().to_path_buf(),
                install_error: install_err.to_string(),
                source,
            }
        }
    }
}

/// Returns the path back if it exists and could not be removed
fn remove_if_present(path: &Path) -> Option<PathBuf> {
    match std::fs::remove_file(path) {
        Ok(()) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Cleanup: could not remove {}: {e}", path.display());
            Some(path.to_path_buf())
        }
    }
}
