use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::download::DEFAULT_API_BASE;
use crate::error::{Result, UpdateError};

pub const DEFAULT_REPOSITORY: &str = "cleboost/VibeCraft";
pub const DEFAULT_ENCODER_BASE_URL: &str =
    "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest";

const APP_DIR_NAME: &str = ".vibecraft";
const ENCODER_DIR_NAME: &str = "ffmpeg";
const MARKER_FILE_NAME: &str = "last_seen_version.txt";

/// Updater configuration (`<config_dir>/vibecraft/updater.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// `owner/repo` on the release host
    pub repository: String,
    pub api_base: String,
    /// Version of the running build, `v` prefix optional
    pub current_version: String,
    pub check_timeout_secs: u64,
    /// Abort a download after this long without receiving bytes
    pub inactivity_timeout_secs: u64,
    /// Per-user application directory; `~/.vibecraft` when unset
    pub app_dir: Option<PathBuf>,
    /// Where update artifacts are downloaded; `<temp>/vibecraft-updates` when unset
    pub download_dir: Option<PathBuf>,
    /// Development builds never report updates
    pub dev_mode: bool,
    pub encoder: EncoderConfig,
    pub relaunch: RelaunchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub base_url: String,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaunchConfig {
    pub delay_secs: u64,
    pub diagnostic_delay_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.into(),
            api_base: DEFAULT_API_BASE.into(),
            current_version: concat!("v", env!("CARGO_PKG_VERSION")).into(),
            check_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            app_dir: None,
            download_dir: None,
            dev_mode: false,
            encoder: EncoderConfig::default(),
            relaunch: RelaunchConfig::default(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENCODER_BASE_URL.into(),
            download_timeout_secs: 600,
        }
    }
}

impl Default for RelaunchConfig {
    fn default() -> Self {
        Self {
            delay_secs: 2,
            diagnostic_delay_secs: 3,
        }
    }
}

impl UpdaterConfig {
    /// Default on-disk location of this file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vibecraft").join("updater.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let mut parts = self.repository.split('/');
        let valid_repo = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
        );
        if !valid_repo {
            return Err(UpdateError::Config(format!(
                "repository must be 'owner/repo', got '{}'",
                self.repository
            )));
        }
        if self.current_version.trim().is_empty() {
            return Err(UpdateError::Config("current_version is empty".into()));
        }
        if self.check_timeout_secs == 0 {
            return Err(UpdateError::Config("check_timeout_secs must be positive".into()));
        }
        url::Url::parse(&self.api_base).map_err(|e| {
            UpdateError::Config(format!("api_base '{}' is not a URL: {e}", self.api_base))
        })?;
        Ok(())
    }

    pub fn app_dir(&self) -> Result<PathBuf> {
        match &self.app_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(APP_DIR_NAME))
                .ok_or_else(|| UpdateError::Config("could not determine home directory".into())),
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vibecraft-updates"))
    }

    /// `<app_dir>/ffmpeg`
    pub fn encoder_dir(&self) -> Result<PathBuf> {
        Ok(self.app_dir()?.join(ENCODER_DIR_NAME))
    }

    /// `<app_dir>/last_seen_version.txt`
    pub fn marker_path(&self) -> Result<PathBuf> {
        Ok(self.app_dir()?.join(MARKER_FILE_NAME))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
