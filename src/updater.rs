//! Self-update facade: check, download, install, relaunch
//!
//! [`SelfUpdater`] wires the release feed, downloader, installer, relauncher
//! and encoder provisioner together from one [`UpdaterConfig`]. Each method
//! is a single sequential flow on the caller's task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;

use crate::changelog::{ChangelogDecision, VersionMarker};
use crate::config::UpdaterConfig;
use crate::control::{ProcessRelauncher, RelaunchHandle, RelaunchMode};
use crate::download::{
    Downloader, HostPlatform, ProgressSink, ReleaseFeedClient, select_for_platform,
};
use crate::encoder::EncoderProvisioner;
use crate::error::{Result, UpdateError};
use crate::install::{
    AtomicInstaller, ExecutableSlot, InstallReport, ReconcileReport, sweep_downloads,
};
use crate::version;

const DEV_MODE_NOTES: &str = "dev mode: no update check";

/// Result of comparing the running build against the latest release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateAvailability {
    pub available: bool,
    pub current_version: String,
    pub latest_version: String,
    pub release_notes: String,
    /// Set only when an update is available
    pub download_url: Option<String>,
    pub size: Option<u64>,
    pub release_url: Option<String>,
}

pub struct SelfUpdater {
    config: UpdaterConfig,
    platform: HostPlatform,
    slot: ExecutableSlot,
    feed: ReleaseFeedClient,
    downloader: Downloader,
    installer: AtomicInstaller,
    relauncher: ProcessRelauncher,
    encoder: EncoderProvisioner,
    marker: VersionMarker,
}

impl SelfUpdater {
    /// Updater for the running executable on the detected host
    pub fn new(config: UpdaterConfig) -> Result<Self> {
        Self::for_target(config, HostPlatform::detect(), ExecutableSlot::current()?)
    }

    /// Updater for an arbitrary executable path and platform
    pub fn for_target(
        config: UpdaterConfig,
        platform: HostPlatform,
        slot: ExecutableSlot,
    ) -> Result<Self> {
        config.validate()?;

        let feed = ReleaseFeedClient::new(config.api_base.clone(), config.check_timeout())?;
        let downloader = Downloader::builder(config.download_dir())
            .inactivity_timeout(config.inactivity_timeout())
            .build()?;
        let relauncher = ProcessRelauncher::new(
            Duration::from_secs(config.relaunch.delay_secs),
            Duration::from_secs(config.relaunch.diagnostic_delay_secs),
        );
        let encoder = EncoderProvisioner::new(
            platform.clone(),
            config.encoder.base_url.clone(),
            config.encoder_dir()?,
            Duration::from_secs(config.encoder.download_timeout_secs),
        );
        let marker = VersionMarker::new(config.marker_path()?);

        Ok(Self {
            config,
            platform,
            slot,
            feed,
            downloader,
            installer: AtomicInstaller::for_host(),
            relauncher,
            encoder,
            marker,
        })
    }

    pub fn with_installer(mut self, installer: AtomicInstaller) -> Self {
        self.installer = installer;
        self
    }

    pub fn with_relauncher(mut self, relauncher: ProcessRelauncher) -> Self {
        self.relauncher = relauncher;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn slot(&self) -> &ExecutableSlot {
        &self.slot
    }

    pub fn encoder(&self) -> &EncoderProvisioner {
        &self.encoder
    }

    pub fn marker(&self) -> &VersionMarker {
        &self.marker
    }

    /// Query the feed and decide whether the latest release is newer.
    ///
    /// The asset is only looked up when an update exists; a newer release
    /// without an asset for this platform is an error, not "no update".
    pub async fn check_for_update(&self) -> Result<UpdateAvailability> {
        let current = self.config.current_version.clone();

        if self.config.dev_mode {
            info!("Dev mode, skipping update check");
            return Ok(UpdateAvailability {
                available: false,
                latest_version: current.clone(),
                current_version: current,
                release_notes: DEV_MODE_NOTES.into(),
                download_url: None,
                size: None,
                release_url: None,
            });
        }

        let release = self.feed.fetch_latest(&self.config.repository).await?;
        let notes = release.body.clone().unwrap_or_default();
        let release_url = Some(release.html_url.clone()).filter(|u| !u.is_empty());

        if !version::is_newer(&current, &release.tag_name) {
            info!("Up to date ({current}, latest {})", release.tag_name);
            return Ok(UpdateAvailability {
                available: false,
                current_version: current,
                latest_version: release.tag_name,
                release_notes: notes,
                download_url: None,
                size: None,
                release_url,
            });
        }

        let asset = select_for_platform(&release.assets, &self.platform)?;
        info!(
            "Update available: {current} -> {} ({})",
            release.tag_name, asset.name
        );

        Ok(UpdateAvailability {
            available: true,
            current_version: current,
            latest_version: release.tag_name.clone(),
            release_notes: notes,
            download_url: Some(asset.browser_download_url.clone()),
            size: Some(asset.size).filter(|s| *s > 0),
            release_url,
        })
    }

    /// Same answer as [`Self::check_for_update`], kept as its own entry point
    /// for the "about" screen
    pub async fn latest_release_info(&self) -> Result<UpdateAvailability> {
        self.check_for_update().await
    }

    pub async fn download_update<S>(&self, url: &str, progress: &mut S) -> Result<PathBuf>
    where
        S: ProgressSink + ?Sized,
    {
        self.downloader.download(url, progress).await
    }

    pub async fn install_update(&self, artifact: &Path) -> Result<InstallReport> {
        let report = self.installer.install(artifact, &self.slot).await?;
        if !report.leftovers.is_empty() {
            warn!(
                "Install left {} file(s) behind; they are removed on next start",
                report.leftovers.len()
            );
        }
        Ok(report)
    }

    /// Install, then schedule a relaunch of the new executable.
    ///
    /// Nothing is scheduled when the install fails. Awaiting
    /// [`RelaunchHandle::wait`] only returns on cancel or a failed spawn.
    pub async fn install_update_and_relaunch(&self, artifact: &Path) -> Result<RelaunchHandle> {
        self.install_update(artifact).await?;
        Ok(self.relaunch(RelaunchMode::Normal))
    }

    pub fn relaunch(&self, mode: RelaunchMode) -> RelaunchHandle {
        self.relauncher.schedule(self.slot.exe(), mode)
    }

    pub fn is_encoder_installed(&self) -> bool {
        self.encoder.is_installed()
    }

    pub async fn provision_encoder<S>(&self, progress: &mut S) -> Result<PathBuf>
    where
        S: ProgressSink + ?Sized,
    {
        self.encoder.provision(progress).await
    }

    /// Repair the executable slot and clear the download directory
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = self.installer.reconcile(&self.slot).await?;

        let download_dir = self.downloader.dest_dir().to_path_buf();
        let sweep_dir = download_dir.clone();
        let swept = tokio::task::spawn_blocking(move || sweep_downloads(&sweep_dir))
            .await
            .map_err(|e| {
                UpdateError::io(
                    "sweep download directory",
                    download_dir,
                    std::io::Error::other(e),
                )
            })??;
        report.removed.extend(swept);

        if report.restored_backup || !report.removed.is_empty() {
            info!(
                "Reconciled: restored={}, removed {} file(s)",
                report.restored_backup,
                report.removed.len()
            );
        }
        Ok(report)
    }

    pub fn changelog_decision(&self) -> ChangelogDecision {
        self.marker
            .should_show_changelog(&self.config.current_version, self.config.dev_mode)
    }

    pub fn mark_changelog_seen(&self) -> Result<()> {
        self.marker.mark_seen(&self.config.current_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updater(dir: &Path, dev_mode: bool) -> SelfUpdater {
        let config = UpdaterConfig {
            current_version: "v1.2.8".into(),
            app_dir: Some(dir.join("app")),
            download_dir: Some(dir.join("downloads")),
            api_base: "http://127.0.0.1:9".into(),
            dev_mode,
            ..Default::default()
        };
        SelfUpdater::for_target(
            config,
            HostPlatform::new("linux", "x86_64"),
            ExecutableSlot::new(dir.join("vibecraft")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn dev_mode_reports_no_update_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let availability = updater(dir.path(), true).check_for_update().await.unwrap();
        assert!(!availability.available);
        assert_eq!(availability.current_version, "v1.2.8");
        assert_eq!(availability.latest_version, "v1.2.8");
        assert_eq!(availability.release_notes, DEV_MODE_NOTES);
        assert!(availability.download_url.is_none());
    }

    #[tokio::test]
    async fn reconcile_restores_slot_and_sweeps_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path(), false);
        std::fs::write(updater.slot().backup(), b"old").unwrap();
        let downloads = dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("app-linux.zip"), b"partial").unwrap();

        let report = updater.reconcile().await.unwrap();

        assert!(report.restored_backup);
        assert_eq!(report.removed, vec![downloads.join("app-linux.zip")]);
        assert!(updater.slot().exe().exists());
    }

    #[test]
    fn changelog_follows_configured_version() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path(), false);
        assert!(updater.changelog_decision().should_show);
        updater.mark_changelog_seen().unwrap();
        assert!(!updater.changelog_decision().should_show);
    }
}
