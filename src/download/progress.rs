//! Transfer progress values and the in-line observer they are delivered to

use log::{debug, warn};
use tokio::sync::mpsc;

/// Bytes transferred so far against the advertised total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    /// `None` when the server sent no (or a zero) Content-Length
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(downloaded: u64, total: Option<u64>) -> Self {
        Self {
            downloaded,
            total: total.filter(|t| *t > 0),
        }
    }

    /// `floor(downloaded * 100 / total)` clamped to 0..=100; 0 when unknown
    pub fn percent(&self) -> u8 {
        match self.total {
            Some(total) => (self.downloaded.saturating_mul(100) / total).min(100) as u8,
            None => 0,
        }
    }

    /// All advertised bytes have arrived
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.downloaded >= total)
    }

    /// Fraction in 0.0..=1.0, for progress bars
    pub fn fraction(&self) -> f64 {
        match self.total {
            Some(total) => (self.downloaded as f64 / total as f64).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

/// Receives progress in-line on the downloading task.
///
/// Called once per chunk in chunk order, so implementations must return
/// quickly; hand off to another task for anything slow.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, progress: TransferProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(TransferProgress) + Send,
{
    fn on_progress(&mut self, progress: TransferProgress) {
        self(progress)
    }
}

/// Forward progress to a bounded channel, best effort.
///
/// A full channel drops intermediate updates. The completing update
/// (`downloaded >= total`) is never dropped: when the channel is full it is
/// handed to a task that waits for capacity. A closed channel disables
/// forwarding for the rest of the transfer without failing it.
pub struct ChannelSink {
    tx: mpsc::Sender<TransferProgress>,
    disabled: bool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TransferProgress>) -> Self {
        Self {
            tx,
            disabled: false,
        }
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&mut self, progress: TransferProgress) {
        if self.disabled {
            return;
        }
        match self.tx.try_send(progress) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(p)) if p.is_complete() => {
                self.disabled = true;
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        let tx = self.tx.clone();
                        handle.spawn(async move {
                            let _ = tx.send(p).await;
                        });
                    }
                    Err(_) => warn!("Progress channel full and no runtime, final update dropped"),
                }
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Progress channel full, update dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Progress channel closed, continuing download without updates");
                self.disabled = true;
            }
        }
    }
}
