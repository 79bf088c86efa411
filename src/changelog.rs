//! Last-seen-version marker used to decide when to show the changelog

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Result, UpdateError};

/// Outcome of [`VersionMarker::should_show_changelog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogDecision {
    pub should_show: bool,
    /// Version the changelog would be shown for
    pub version: String,
    /// Marker read failure; the changelog is shown anyway
    pub error: Option<String>,
}

/// Plain-text file holding the last app version the user acknowledged
#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
}

impl VersionMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Trimmed marker contents, `None` when the file does not exist
    pub fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpdateError::io("read version marker", &self.path, e)),
        }
    }

    /// Replace the marker contents via a sibling temp file and rename
    pub fn write(&self, version: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| UpdateError::io("create marker directory", parent, e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| UpdateError::io("create marker temp file", &temp_path, e))?;
            file.write_all(version.as_bytes())
                .map_err(|e| UpdateError::io("write marker temp file", &temp_path, e))?;
            file.sync_all()
                .map_err(|e| UpdateError::io("sync marker temp file", &temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| UpdateError::io("replace version marker", &self.path, e))?;
        debug!("Version marker set to {version}");
        Ok(())
    }

    pub fn is_first_time_user(&self) -> bool {
        !self.path.exists()
    }

    /// True when the marker names a different version than `current`.
    ///
    /// A missing marker is initialised to `current` and reported as not an
    /// update, so fresh installs skip the "what's new" screen.
    pub fn is_first_run_after_update(&self, current: &str) -> Result<bool> {
        match self.read()? {
            None => {
                self.write(current)?;
                Ok(false)
            }
            Some(seen) => Ok(seen != current),
        }
    }

    pub fn should_show_changelog(&self, current: &str, dev_mode: bool) -> ChangelogDecision {
        let decision = |should_show, error| ChangelogDecision {
            should_show,
            version: current.to_string(),
            error,
        };

        if dev_mode {
            return decision(false, None);
        }
        if self.is_first_time_user() {
            return decision(true, None);
        }
        match self.read() {
            Ok(Some(seen)) => decision(seen != current, None),
            Ok(None) => decision(true, None),
            Err(e) => {
                warn!("Could not read version marker, showing changelog: {e}");
                decision(true, Some(e.to_string()))
            }
        }
    }

    pub fn mark_seen(&self, current: &str) -> Result<()> {
        self.write(current)
    }
}
