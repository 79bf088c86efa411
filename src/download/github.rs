//! GitHub release API interaction

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// GitHub release metadata from API
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReleaseMetadata {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Fetches the latest release of one repository; one GET per call, no retries
#[derive(Debug, Clone)]
pub struct ReleaseFeedClient {
    client: reqwest::Client,
    api_base: String,
}

impl ReleaseFeedClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vibecraft-updater/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| UpdateError::network("building HTTP client", e))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET {api_base}/repos/{owner}/{repo}/releases/latest`
    pub async fn fetch_latest(&self, repository: &str) -> Result<ReleaseMetadata> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, repository);
        debug!("Fetching latest release from {url}");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::network("release check", e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(UpdateError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdateError::network("release check", e))?;
        serde_json::from_str(&body).map_err(|source| UpdateError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_feed_payload() {
        let json = r#"{
            "tag_name": "v1.3.0",
            "name": "VibeCraft 1.3.0",
            "body": "Fixes",
            "html_url": "https://github.com/o/r/releases/tag/v1.3.0",
            "assets": [
                {
                    "name": "app-linux.zip",
                    "browser_download_url": "https://x/app-linux.zip",
                    "size": 42,
                    "id": 7
                }
            ],
            "draft": false
        }"#;
        let release: ReleaseMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "v1.3.0");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].size, 42);
    }

    #[test]
    fn tolerates_null_body_and_name() {
        let json = r#"{
            "tag_name": "v1.0.0",
            "name": null,
            "body": null,
            "html_url": "",
            "assets": []
        }"#;
        let release: ReleaseMetadata = serde_json::from_str(json).unwrap();
        assert!(release.body.is_none());
    }

    #[test]
    fn trailing_slash_on_api_base_is_dropped() {
        let client = ReleaseFeedClient::new("https://api.example.test/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(client.api_base, "https://api.example.test");
    }
}
