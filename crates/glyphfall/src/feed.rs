//! # Text Feed
//!
//! Polls a [`TextSource`] on its own thread and timer, decoupled from the
//! frame cadence, and hands batches to the frame loop over a bounded channel.
//!
//! ```text
//! ┌──────────────┐ poll  ┌──────────────┐ batch  ┌──────────────┐ offer  ┌────────────┐
//! │  TextSource  │ ◀──── │ poller thread│ ─────▶ │   Channel    │ ─────▶ │ TitleQueue │
//! │ (file, API)  │       │  (interval)  │        │  (Bounded)   │        │  (dedup)   │
//! └──────────────┘       └──────────────┘        └──────────────┘        └────────────┘
//! ```
//!
//! A failed poll is logged and counted; it never reaches the frame loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use glyphfall_core::TitleQueue;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Batches buffered between the poller thread and the frame loop.
const CHANNEL_CAPACITY: usize = 16;

/// Text feed failures.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A file-backed source could not be read.
    #[error("failed to read text source {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source is temporarily unable to deliver.
    #[error("text source unavailable: {0}")]
    Unavailable(String),

    /// The poller thread could not be started.
    #[error("failed to spawn feed poller: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A pollable provider of strings.
///
/// Returning the same strings on every poll is fine; the queue deduplicates.
pub trait TextSource: Send + 'static {
    /// Fetches the current batch.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] when the source cannot deliver right now.
    fn poll(&mut self) -> Result<Vec<String>, FeedError>;
}

/// A fixed list, returned on every poll.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    items: Vec<String>,
}

impl StaticSource {
    /// Creates a source serving `items`.
    #[must_use]
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl TextSource for StaticSource {
    fn poll(&mut self) -> Result<Vec<String>, FeedError> {
        Ok(self.items.clone())
    }
}

/// Re-reads a text file on every poll; each non-blank line is one string.
#[derive(Clone, Debug)]
pub struct LinesFileSource {
    path: PathBuf,
}

impl LinesFileSource {
    /// Creates a source reading `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The watched file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for LinesFileSource {
    fn poll(&mut self) -> Result<Vec<String>, FeedError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| FeedError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

/// Poller counters, shared with the poller thread.
#[derive(Debug, Default)]
pub struct FeedStats {
    /// Polls attempted.
    pub polls: AtomicU64,
    /// Polls that returned an error.
    pub failures: AtomicU64,
    /// Batches dropped because the channel was full.
    pub dropped_batches: AtomicU64,
}

/// Background poller. Dropping it stops the thread and joins it.
#[derive(Debug)]
pub struct FeedPoller {
    receiver: Receiver<Vec<String>>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<FeedStats>,
}

impl FeedPoller {
    /// Starts polling `source` immediately and then every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Spawn`] if the OS refuses a new thread.
    pub fn spawn<S: TextSource>(source: S, interval: Duration) -> Result<Self, FeedError> {
        let (batch_tx, batch_rx) = bounded(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let stats = Arc::new(FeedStats::default());
        let thread_stats = Arc::clone(&stats);

        let handle = std::thread::Builder::new()
            .name("glyphfall-feed".to_string())
            .spawn(move || poll_loop(source, interval, &batch_tx, &shutdown_rx, &thread_stats))?;

        info!(interval_ms = interval.as_millis() as u64, "feed poller started");
        Ok(Self {
            receiver: batch_rx,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            stats,
        })
    }

    /// Moves every delivered batch into `queue` without blocking. Returns
    /// how many strings the queue accepted.
    pub fn drain_into(&self, queue: &mut TitleQueue) -> usize {
        self.receiver.try_iter().map(|batch| queue.offer(batch)).sum()
    }

    /// Poller counters.
    #[must_use]
    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the shutdown channel.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("feed poller thread panicked");
            }
        }
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop<S: TextSource>(
    mut source: S,
    interval: Duration,
    batches: &Sender<Vec<String>>,
    shutdown: &Receiver<()>,
    stats: &FeedStats,
) {
    loop {
        stats.polls.fetch_add(1, Ordering::Relaxed);
        match source.poll() {
            Ok(batch) if batch.is_empty() => {}
            Ok(batch) => {
                debug!(len = batch.len(), "feed batch polled");
                match batches.try_send(batch) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        stats.dropped_batches.fetch_add(1, Ordering::Relaxed);
                        debug!("feed channel full, batch dropped");
                    }
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
            Err(e) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "feed poll failed, treating as empty batch");
            }
        }

        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("feed poller stopping");
                return;
            }
        }
    }
}
