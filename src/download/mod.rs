//! GitHub release discovery, artifact download and archive extraction
//!
//! ## Module Organization
//!
//! - `github` - release feed client (`releases/latest`)
//! - `platform` - host platform tokens and asset selection
//! - `core` - streaming download with progress
//! - `extract` - single-binary zip extraction
//! - `progress` - progress values and sinks

mod core;
pub mod extract;
mod github;
mod platform;
mod progress;

pub use self::core::{CHUNK_SIZE, Downloader, DownloaderBuilder, file_name_from_url};
pub use github::{Asset, DEFAULT_API_BASE, ReleaseFeedClient, ReleaseMetadata};
pub use platform::{HostPlatform, encoder_archive_name, select_for_platform};
pub use progress::{ChannelSink, ProgressSink, TransferProgress};
