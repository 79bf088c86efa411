//! Unix relaunch via `nohup` in a fresh session

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use super::Launcher;

/// Starts `nohup <exe>` as the leader of a new session, so the child is
/// detached from our controlling terminal and ignores the SIGHUP sent
/// when we exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixLauncher;

impl Launcher for UnixLauncher {
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<Option<u32>> {
        let mut cmd = Command::new("nohup");
        cmd.arg(exe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // SAFETY: setsid is async-signal-safe and touches no parent state
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }

        let child = cmd.spawn()?;
        Ok(Some(child.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_detached_child() {
        let child = UnixLauncher.spawn_detached(Path::new("true")).unwrap();
        assert!(child.is_some());
    }
}
