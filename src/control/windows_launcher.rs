//! Windows relaunch: direct detached spawn, PowerShell as fallback

use std::os::windows::process::CommandExt;
use std::path::Path;
use std::process::Command;

use log::warn;

use super::Launcher;

const DETACHED_PROCESS: u32 = 0x0000_0008;
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsLauncher;

impl Launcher for WindowsLauncher {
    fn spawn_detached(&self, exe: &Path) -> std::io::Result<Option<u32>> {
        match Command::new(exe).creation_flags(DETACHED_PROCESS).spawn() {
            Ok(child) => Ok(Some(child.id())),
            Err(e) => {
                warn!(
                    "Direct relaunch of {} failed ({e}), falling back to Start-Process",
                    exe.display()
                );
                start_process_hidden(exe)
            }
        }
    }
}

/// `powershell Start-Process` in a hidden console. Waits for PowerShell to
/// report whether the start succeeded; the new pid is not observable.
fn start_process_hidden(exe: &Path) -> std::io::Result<Option<u32>> {
    let quoted = exe.display().to_string().replace('\'', "''");
    let status = Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command"])
        .arg(format!("Start-Process -FilePath '{quoted}'"))
        .creation_flags(CREATE_NO_WINDOW)
        .status()?;

    if status.success() {
        Ok(None)
    } else {
        Err(std::io::Error::other(format!("Start-Process exited with {status}")))
    }
}
