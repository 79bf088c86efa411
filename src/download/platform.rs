//! Host platform naming for release assets and encoder builds

use crate::error::{Result, UpdateError};

use super::github::Asset;

/// Host OS / architecture pair, as reported by `std::env::consts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Lowercase token release assets are named with
    pub fn asset_token(&self) -> String {
        match self.os.as_str() {
            "windows" => "windows".to_string(),
            "macos" | "darwin" => "darwin".to_string(),
            "linux" => "linux".to_string(),
            other => other.to_lowercase(),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// File name of an executable on this platform (`ffmpeg` / `ffmpeg.exe`)
    pub fn executable_name(&self, stem: &str) -> String {
        if self.is_windows() {
            format!("{stem}.exe")
        } else {
            stem.to_string()
        }
    }
}

/// First asset whose lowercase name contains the platform token.
///
/// Feed order is authoritative; there is no secondary sort.
pub fn select_for_platform<'a>(
    assets: &'a [Asset],
    platform: &HostPlatform,
) -> Result<&'a Asset> {
    let token = platform.asset_token();
    assets
        .iter()
        .find(|a| a.name.to_lowercase().contains(&token))
        .ok_or_else(|| UpdateError::NoMatchingAsset {
            platform: token,
            available: assets
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Archive name of the prebuilt encoder for a platform, if one is published
pub fn encoder_archive_name(platform: &HostPlatform) -> Result<&'static str> {
    match (platform.os.as_str(), platform.arch.as_str()) {
        ("windows", "x86_64") => Ok("ffmpeg-master-latest-win64-gpl.zip"),
        ("macos", "x86_64" | "aarch64") => Ok("ffmpeg-master-latest-macos64-gpl.zip"),
        ("linux", "x86_64") => Ok("ffmpeg-master-latest-linux64-gpl.zip"),
        (os, arch) => Err(UpdateError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            browser_download_url: format!("https://dl.example.test/{name}"),
            size: 10,
        }
    }

    fn token(os: &str) -> String {
        HostPlatform::new(os, "x86_64").asset_token()
    }

    #[test]
    fn tokens_per_os() {
        assert_eq!(token("windows"), "windows");
        assert_eq!(token("macos"), "darwin");
        assert_eq!(token("linux"), "linux");
        assert_eq!(token("FreeBSD"), "freebsd");
    }

    #[test]
    fn first_match_in_feed_order_wins() {
        let assets = vec![
            asset("app-linux-arm.zip"),
            asset("App-Linux.zip"),
            asset("app-windows.zip"),
        ];
        let linux = HostPlatform::new("linux", "x86_64");
        let selected = select_for_platform(&assets, &linux).unwrap();
        assert_eq!(selected.name, "app-linux-arm.zip");
    }

    #[test]
    fn match_is_case_insensitive() {
        let assets = vec![asset("APP-DARWIN.zip")];
        let mac = HostPlatform::new("macos", "aarch64");
        let selected = select_for_platform(&assets, &mac).unwrap();
        assert_eq!(selected.name, "APP-DARWIN.zip");
    }

    #[test]
    fn no_match_lists_available_assets() {
        let assets = vec![asset("app-windows.zip")];
        let err = select_for_platform(&assets, &HostPlatform::new("linux", "x86_64")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoMatchingAsset);
        assert!(err.to_string().contains("app-windows.zip"));
    }

    #[test]
    fn encoder_archives() {
        assert!(encoder_archive_name(&HostPlatform::new("windows", "x86_64")).is_ok());
        assert!(encoder_archive_name(&HostPlatform::new("macos", "aarch64")).is_ok());
        let err = encoder_archive_name(&HostPlatform::new("linux", "aarch64")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedPlatform);
    }

    #[test]
    fn executable_names() {
        let windows = HostPlatform::new("windows", "x86_64");
        let linux = HostPlatform::new("linux", "x86_64");
        assert_eq!(windows.executable_name("ffmpeg"), "ffmpeg.exe");
        assert_eq!(linux.executable_name("ffmpeg"), "ffmpeg");
    }
}
