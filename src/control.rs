//! Relaunch of the application after an update
//!
//! A relaunch is a timed task: after a short delay it starts a detached
//! copy of the executable and, only once that spawn succeeded, terminates
//! the current process. Until the delay elapses the caller may cancel it.
//! A failed spawn is reported as [`UpdateError::RelaunchFailed`] and the
//! current process keeps running.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, UpdateError};

// Platform-specific launchers
cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows_launcher;
        pub use windows_launcher::WindowsLauncher as HostLauncher;
    } else {
        mod unix_launcher;
        pub use unix_launcher::UnixLauncher as HostLauncher;
    }
}

pub const DEFAULT_RELAUNCH_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_DIAGNOSTIC_DELAY: Duration = Duration::from_secs(3);

/// Starts a new, detached instance of an executable
pub trait Launcher: Send + Sync {
    /// Returns the new process id when the platform reports one
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<Option<u32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaunchMode {
    /// Post-update restart
    Normal,
    /// Manual restart test from the diagnostics screen; slightly longer delay
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaunchOutcome {
    Cancelled,
    Spawned { pid: Option<u32> },
}

type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

pub struct ProcessRelauncher {
    launcher: Arc<dyn Launcher>,
    delay: Duration,
    diagnostic_delay: Duration,
    exit: ExitHook,
}

impl ProcessRelauncher {
    pub fn new(delay: Duration, diagnostic_delay: Duration) -> Self {
        Self {
            launcher: Arc::new(HostLauncher),
            delay,
            diagnostic_delay,
            exit: Arc::new(exit_process),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Replace `std::process::exit`; used to observe termination in tests
    pub fn with_exit_hook(mut self, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Arc::new(exit);
        self
    }

    fn delay_for(&self, mode: RelaunchMode) -> Duration {
        match mode {
            RelaunchMode::Normal => self.delay,
            RelaunchMode::Diagnostic => self.diagnostic_delay,
        }
    }

    /// Schedule the relaunch on the current Tokio runtime
    pub fn schedule(&self, exe: &Path, mode: RelaunchMode) -> RelaunchHandle {
        let cancel = CancellationToken::new();
        let delay = self.delay_for(mode);
        let target = exe.to_path_buf();
        let launcher = Arc::clone(&self.launcher);
        let exit = Arc::clone(&self.exit);
        let token = cancel.clone();

        info!(
            "Relaunch of {} scheduled in {}s",
            target.display(),
            delay.as_secs()
        );

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Relaunch cancelled");
                    Ok(RelaunchOutcome::Cancelled)
                }
                _ = tokio::time::sleep(delay) => {
                    relaunch_now(launcher.as_ref(), &target, exit.as_ref())
                }
            }
        });

        RelaunchHandle {
            exe: exe.to_path_buf(),
            cancel,
            task,
        }
    }
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

fn relaunch_now(
    launcher: &dyn Launcher,
    exe: &Path,
    exit: &(dyn Fn(i32) + Send + Sync),
) -> Result<RelaunchOutcome> {
    match launcher.spawn_detached(exe) {
        Ok(pid) => {
            info!(
                "Started new instance of {} (pid {:?}), exiting",
                exe.display(),
                pid
            );
            exit(0);
            Ok(RelaunchOutcome::Spawned { pid })
        }
        Err(e) => {
            error!("Relaunch of {} failed: {e}", exe.display());
            Err(UpdateError::RelaunchFailed {
                exe: exe.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}

/// A scheduled relaunch
pub struct RelaunchHandle {
    exe: PathBuf,
    cancel: CancellationToken,
    task: JoinHandle<Result<RelaunchOutcome>>,
}

impl RelaunchHandle {
    /// Stop the relaunch; has no effect once the delay has elapsed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the relaunch to resolve. In production a successful spawn
    /// terminates the process, so this only returns on cancel or failure.
    pub async fn wait(self) -> Result<RelaunchOutcome> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Relaunch task did not complete: {e}");
                Err(UpdateError::RelaunchFailed {
                    exe: self.exe,
                    reason: format!("relaunch task aborted: {e}"),
                })
            }
        }
    }
}
