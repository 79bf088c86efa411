//! Single-binary extraction from zip artifacts
//!
//! Both the encoder archive (`<root>/bin/ffmpeg[.exe]`) and the Windows app
//! update (`*.exe`) carry exactly one file we care about. The entry is
//! streamed to a temporary sibling and renamed into place, so the
//! destination never holds a half-written binary.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use zip::ZipArchive;

use crate::error::{Result, UpdateError};

/// Entry whose path ends in `/bin/<name>` or `\bin\<name>`
pub fn is_bin_entry(entry_name: &str, binary_name: &str) -> bool {
    entry_name.ends_with(&format!("/bin/{binary_name}"))
        || entry_name.ends_with(&format!("\\bin\\{binary_name}"))
}

/// Entry ending in `.exe`, case-insensitive
pub fn is_exe_entry(entry_name: &str) -> bool {
    entry_name.to_ascii_lowercase().ends_with(".exe")
}

/// Extract the platform binary from an encoder-style archive into
/// `dest_dir/<binary_name>`, marking it executable on unix.
pub fn extract_binary(zip_path: &Path, dest_dir: &Path, binary_name: &str) -> Result<PathBuf> {
    let dest = dest_dir.join(binary_name);
    extract_first_matching(
        zip_path,
        &dest,
        |name| is_bin_entry(name, binary_name),
        binary_name,
    )?;
    set_executable(&dest)?;
    Ok(dest)
}

/// Stream the first file entry accepted by `matches` to `dest`.
///
/// `wanted` only describes the search in the not-found error.
pub fn extract_first_matching<F>(
    zip_path: &Path,
    dest: &Path,
    matches: F,
    wanted: &str,
) -> Result<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let zip_file = File::open(zip_path).map_err(|e| UpdateError::io("open archive", zip_path, e))?;
    let mut archive =
        ZipArchive::new(zip_file).map_err(|e| zip_error("read archive", zip_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| zip_error("read archive entry", zip_path, e))?;
        if entry.is_dir() || !matches(entry.name()) {
            continue;
        }

        debug!(
            "Extracting {} from {} to {}",
            entry.name(),
            zip_path.display(),
            dest.display()
        );

        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::Builder::new()
            .prefix(".extract-")
            .tempfile_in(parent)
            .map_err(|e| UpdateError::io("create extraction temp file", parent, e))?;

        io::copy(&mut entry, staged.as_file_mut())
            .map_err(|e| UpdateError::io("extract archive entry", dest, e))?;
        staged
            .as_file_mut()
            .flush()
            .map_err(|e| UpdateError::io("flush extracted file", dest, e))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|e| UpdateError::io("sync extracted file", dest, e))?;

        staged
            .persist(dest)
            .map_err(|e| UpdateError::io("move extracted file into place", dest, e.error))?;
        return Ok(dest.to_path_buf());
    }

    Err(UpdateError::BinaryNotFoundInArchive {
        archive: zip_path.to_path_buf(),
        wanted: wanted.to_string(),
    })
}

/// chmod 0755 on unix; no-op elsewhere
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| UpdateError::io("set executable permissions", path, e))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

fn zip_error(operation: &'static str, path: &Path, err: zip::result::ZipError) -> UpdateError {
    UpdateError::io(
        operation,
        path,
        io::Error::new(io::ErrorKind::InvalidData, err),
    )
}
