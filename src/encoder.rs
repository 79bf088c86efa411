//! On-demand provisioning of the external ffmpeg encoder
//!
//! The encoder is not bundled with the app. It is fetched as a prebuilt zip
//! for the host platform, the single `bin/ffmpeg[.exe]` entry is extracted
//! into `<app_dir>/ffmpeg/`, and the result is verified before reporting
//! success. This flow never touches the application's own executable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use crate::config::UpdaterConfig;
use crate::download::{Downloader, HostPlatform, ProgressSink, encoder_archive_name, extract};
use crate::error::{Result, UpdateError};

const TEMP_ARCHIVE_NAME: &str = "ffmpeg_temp.zip";

/// Paths and source for one platform's encoder, fixed at construction
#[derive(Debug, Clone)]
pub struct EncoderProvisioner {
    platform: HostPlatform,
    base_url: String,
    encoder_dir: PathBuf,
    binary_name: String,
    download_timeout: Duration,
}

impl EncoderProvisioner {
    pub fn new(
        platform: HostPlatform,
        base_url: impl Into<String>,
        encoder_dir: impl Into<PathBuf>,
        download_timeout: Duration,
    ) -> Self {
        let binary_name = platform.executable_name("ffmpeg");
        Self {
            platform,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            encoder_dir: encoder_dir.into(),
            binary_name,
            download_timeout,
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        Ok(Self::new(
            HostPlatform::detect(),
            config.encoder.base_url.clone(),
            config.encoder_dir()?,
            Duration::from_secs(config.encoder.download_timeout_secs),
        ))
    }

    /// `<encoder_dir>/ffmpeg[.exe]`
    pub fn binary_path(&self) -> PathBuf {
        self.encoder_dir.join(&self.binary_name)
    }

    pub fn encoder_dir(&self) -> &Path {
        &self.encoder_dir
    }

    /// Fails with `UnsupportedPlatform` when no build is published for the host
    pub fn download_url(&self) -> Result<String> {
        let archive = encoder_archive_name(&self.platform)?;
        Ok(format!("{}/{archive}", self.base_url))
    }

    pub fn is_installed(&self) -> bool {
        self.binary_path().is_file()
    }

    /// Download, extract and verify the encoder. Returns the binary path.
    pub async fn provision<S>(&self, progress: &mut S) -> Result<PathBuf>
    where
        S: ProgressSink + ?Sized,
    {
        // resolved first: unsupported hosts fail before any network traffic
        let url = self.download_url()?;

        tokio::fs::create_dir_all(&self.encoder_dir)
            .await
            .map_err(|e| UpdateError::io("create encoder directory", &self.encoder_dir, e))?;

        let archive = self.encoder_dir.join(TEMP_ARCHIVE_NAME);
        let result = self.fetch_and_extract(&url, &archive, progress).await;

        if let Err(e) = tokio::fs::remove_file(&archive).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                "Could not remove temporary encoder archive {}: {e}",
                archive.display()
            );
        }

        let binary = result?;
        verify_installed(&binary)?;
        info!("Encoder installed at {}", binary.display());
        Ok(binary)
    }

    async fn fetch_and_extract<S>(
        &self,
        url: &str,
        archive: &Path,
        progress: &mut S,
    ) -> Result<PathBuf>
    where
        S: ProgressSink + ?Sized,
    {
        let downloader = Downloader::builder(&self.encoder_dir)
            .total_timeout(self.download_timeout)
            .build()?;
        downloader.download_to(url, archive, progress).await?;

        let archive = archive.to_path_buf();
        let dest_dir = self.encoder_dir.clone();
        let binary_name = self.binary_name.clone();
        tokio::task::spawn_blocking(move || {
            extract::extract_binary(&archive, &dest_dir, &binary_name)
        })
        .await
        .map_err(|e| UpdateError::InstallVerificationFailed {
            path: self.binary_path(),
            reason: format!("extraction task aborted: {e}"),
        })?
    }

    /// Transcode a WebM capture to an H.264/AAC MP4 with the provisioned encoder
    pub async fn convert_webm_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        if !self.is_installed() {
            return Err(UpdateError::EncodeFailed {
                input: input.to_path_buf(),
                reason: format!(
                    "encoder not installed at {}",
                    self.binary_path().display()
                ),
            });
        }
        match tokio::fs::metadata(input).await {
            Ok(meta) if meta.len() == 0 => {
                return Err(UpdateError::EncodeFailed {
                    input: input.to_path_buf(),
                    reason: "input file is empty".into(),
                });
            }
            Ok(_) => {}
            Err(e) => return Err(UpdateError::io("read encoder input", input, e)),
        }

        let output_result = tokio::process::Command::new(self.binary_path())
            .arg("-i")
            .arg(input)
            .args([
                "-c:v", "libx264", "-c:a", "aac", "-preset", "medium", "-crf", "20",
            ])
            .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart", "-y"])
            .arg(output)
            .output()
            .await
            .map_err(|e| UpdateError::io("run encoder", self.binary_path(), e))?;

        if !output_result.status.success() {
            return Err(UpdateError::EncodeFailed {
                input: input.to_path_buf(),
                reason: format!(
                    "encoder exited with {}: {}{}",
                    output_result.status,
                    String::from_utf8_lossy(&output_result.stderr),
                    String::from_utf8_lossy(&output_result.stdout)
                ),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            Ok(_) => Err(UpdateError::EncodeFailed {
                input: input.to_path_buf(),
                reason: "output file is empty".into(),
            }),
            Err(e) => Err(UpdateError::EncodeFailed {
                input: input.to_path_buf(),
                reason: format!("output {} not created: {e}", output.display()),
            }),
        }
    }
}

fn verify_installed(binary: &Path) -> Result<()> {
    match std::fs::metadata(binary) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(UpdateError::InstallVerificationFailed {
            path: binary.to_path_buf(),
            reason: "extracted binary is empty".into(),
        }),
        Err(e) => Err(UpdateError::InstallVerificationFailed {
            path: binary.to_path_buf(),
            reason: format!("extracted binary missing: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::TransferProgress;
    use crate::error::ErrorKind;

    fn provisioner(os: &str, arch: &str) -> EncoderProvisioner {
        EncoderProvisioner::new(
            HostPlatform::new(os, arch),
            "https://builds.example.test/latest/",
            "/home/u/.vibecraft/ffmpeg",
            Duration::from_secs(600),
        )
    }

    #[test]
    fn urls_per_platform() {
        assert_eq!(
            provisioner("linux", "x86_64").download_url().unwrap(),
            "https://builds.example.test/latest/ffmpeg-master-latest-linux64-gpl.zip"
        );
        let windows = provisioner("windows", "x86_64").download_url().unwrap();
        assert!(windows.ends_with("win64-gpl.zip"));
    }

    #[test]
    fn binary_path_is_fixed_per_platform() {
        assert_eq!(
            provisioner("windows", "x86_64").binary_path(),
            PathBuf::from("/home/u/.vibecraft/ffmpeg").join("ffmpeg.exe")
        );
        assert_eq!(
            provisioner("linux", "x86_64").binary_path(),
            PathBuf::from("/home/u/.vibecraft/ffmpeg/ffmpeg")
        );
    }

    #[tokio::test]
    async fn unsupported_platform_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let p = EncoderProvisioner::new(
            HostPlatform::new("linux", "riscv64"),
            "http://127.0.0.1:9",
            dir.path().join("ffmpeg"),
            Duration::from_secs(1),
        );
        let err = p
            .provision(&mut |_: TransferProgress| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
        assert!(!dir.path().join("ffmpeg").exists());
    }

    #[test]
    fn verification_rejects_empty_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("ffmpeg");
        std::fs::write(&bin, b"").unwrap();
        let err = verify_installed(&bin).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InstallVerificationFailed);
        std::fs::write(&bin, b"\x7fELF").unwrap();
        verify_installed(&bin).unwrap();
    }
}
