//! Streaming artifact download with in-line progress reporting

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::TryStreamExt;
use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::io::StreamReader;

use super::progress::{ProgressSink, TransferProgress};
use crate::error::{Result, UpdateError};

/// Read size for the body loop; progress fires after each read
pub const CHUNK_SIZE: usize = 32 * 1024;

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Streams a URL into a local file.
///
/// A failed transfer leaves the partial file in place; the startup sweep
/// (`install::reconcile::sweep_downloads`) removes it later.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    dest_dir: PathBuf,
    inactivity_timeout: Duration,
}

impl Downloader {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(dest_dir).build()
    }

    pub fn builder(dest_dir: impl Into<PathBuf>) -> DownloaderBuilder {
        DownloaderBuilder {
            dest_dir: dest_dir.into(),
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            total_timeout: None,
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Download into `dest_dir`, naming the file after the URL's last path segment
    pub async fn download<S>(&self, url: &str, progress: &mut S) -> Result<PathBuf>
    where
        S: ProgressSink + ?Sized,
    {
        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(|e| UpdateError::io("create download directory", &self.dest_dir, e))?;

        let path = self.dest_dir.join(file_name_from_url(url));
        self.download_to(url, &path, progress).await?;
        Ok(path)
    }

    /// Download into an explicit path, truncating whatever is there
    pub async fn download_to<S>(&self, url: &str, path: &Path, progress: &mut S) -> Result<u64>
    where
        S: ProgressSink + ?Sized,
    {
        info!("Downloading {url} -> {}", path.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdateError::network("download", e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(UpdateError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let total = response.content_length().filter(|len| *len > 0);
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = std::pin::pin!(StreamReader::new(stream));

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| UpdateError::io("create download file", path, e))?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;

        loop {
            let read = match timeout(self.inactivity_timeout, reader.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(UpdateError::network("download", e)),
                Err(_) => {
                    return Err(UpdateError::network(
                        "download",
                        std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!(
                                "no data received for {} seconds ({downloaded} bytes received)",
                                self.inactivity_timeout.as_secs()
                            ),
                        ),
                    ));
                }
            };

            file.write_all(&buf[..read])
                .await
                .map_err(|e| UpdateError::io("write download file", path, e))?;
            downloaded += read as u64;

            if total.is_some() {
                progress.on_progress(TransferProgress::new(downloaded, total));
            }
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::io("flush download file", path, e))?;
        file.sync_all()
            .await
            .map_err(|e| UpdateError::io("sync download file", path, e))?;

        debug!("Downloaded {downloaded} bytes from {url}");
        Ok(downloaded)
    }
}

pub struct DownloaderBuilder {
    dest_dir: PathBuf,
    inactivity_timeout: Duration,
    total_timeout: Option<Duration>,
}

impl DownloaderBuilder {
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Upper bound on a whole transfer, headers to last byte
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Downloader> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .user_agent(concat!("vibecraft-updater/", env!("CARGO_PKG_VERSION")));
        if let Some(total) = self.total_timeout {
            builder = builder.timeout(total);
        }
        let client = builder
            .build()
            .map_err(|e| UpdateError::network("building HTTP client", e))?;

        Ok(Downloader {
            client,
            dest_dir: self.dest_dir,
            inactivity_timeout: self.inactivity_timeout,
        })
    }
}

/// Last non-empty path segment of a URL, or `download` if there is none
pub fn file_name_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            file_name_from_url("https://github.com/o/r/releases/download/v1.3.0/app-linux.zip"),
            "app-linux.zip"
        );
        assert_eq!(
            file_name_from_url("https://example.test/a/b.zip?token=1"),
            "b.zip"
        );
    }

    #[test]
    fn file_name_falls_back() {
        assert_eq!(file_name_from_url("https://example.test/"), "download");
        assert_eq!(file_name_from_url("not a url"), "download");
    }
}
