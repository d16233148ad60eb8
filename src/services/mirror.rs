//! Background mirror of cache entries to the shared external cache
//!
//! Writes are handed to a bounded channel and performed by a single
//! background task. A full channel drops the write. Unavailable errors are
//! retried with jittered exponential backoff up to `max_attempts`; rejected
//! entries are not retried. Nothing here ever reaches the local cache's
//! result: the counters in [`MirrorStats`] are the only record of failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SharedCacheConfig;
use crate::errors::SharedCacheError;
use crate::models::{CacheEntry, ShowId};
use crate::observability::CacheMetrics;
use crate::services::traits::SharedCache;
use crate::utils::jitter::backoff_with_jitter;

/// Mirror counters
#[derive(Debug, Default)]
pub struct MirrorStats {
    queued: AtomicU64,
    mirrored: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    read_failures: AtomicU64,
}

/// Point-in-time copy of [`MirrorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStatsSnapshot {
    pub queued: u64,
    pub mirrored: u64,
    pub failed: u64,
    pub dropped: u64,
    pub read_failures: u64,
}

impl MirrorStats {
    pub fn snapshot(&self) -> MirrorStatsSnapshot {
        MirrorStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            mirrored: self.mirrored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the mirror task. Cheap to clone.
#[derive(Clone)]
pub struct SharedCacheMirror {
    inner: Arc<MirrorInner>,
}

struct MirrorInner {
    shared_cache: Arc<dyn SharedCache>,
    sender: mpsc::Sender<CacheEntry>,
    stats: Arc<MirrorStats>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: CacheMetrics,
}

struct MirrorWorker {
    shared_cache: Arc<dyn SharedCache>,
    receiver: mpsc::Receiver<CacheEntry>,
    stats: Arc<MirrorStats>,
    cancel: CancellationToken,
    max_attempts: u32,
    retry_backoff: Duration,
    metrics: CacheMetrics,
}

impl SharedCacheMirror {
    /// Start the background task. Must be called inside a tokio runtime.
    pub fn spawn(
        shared_cache: Arc<dyn SharedCache>,
        config: &SharedCacheConfig,
        metrics: CacheMetrics,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let stats = Arc::new(MirrorStats::default());
        let cancel = CancellationToken::new();

        let worker = MirrorWorker {
            shared_cache: shared_cache.clone(),
            receiver,
            stats: stats.clone(),
            cancel: cancel.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff,
            metrics: metrics.clone(),
        };
        let handle = tokio::spawn(worker.run());

        debug!(
            "Shared cache mirror started (capacity {}, {} attempts)",
            config.channel_capacity, config.max_attempts
        );

        Self {
            inner: Arc::new(MirrorInner {
                shared_cache,
                sender,
                stats,
                cancel,
                worker: Mutex::new(Some(handle)),
                metrics,
            }),
        }
    }

    /// Queue an entry for mirroring. Returns `false` if it was dropped.
    pub fn enqueue(&self, entry: CacheEntry) -> bool {
        let provider = entry.provider.clone();
        match self.inner.sender.try_send(entry) {
            Ok(()) => {
                self.inner.stats.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(entry)) => {
                self.inner.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .metrics
                    .mirror_dropped
                    .add(1, &CacheMetrics::provider_attrs(&provider));
                debug!("Shared cache mirror queue full, dropping {}", entry.url);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.inner.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Read matching rows from the shared cache. Failures read as no rows.
    pub async fn fetch(
        &self,
        provider: &str,
        show_id: ShowId,
        season: i32,
        episode: u32,
    ) -> Vec<CacheEntry> {
        match self
            .inner
            .shared_cache
            .get(provider, show_id, season, episode)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.inner.stats.read_failures.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .metrics
                    .mirror_failures
                    .add(1, &CacheMetrics::reason_attrs(provider, "read"));
                debug!("Shared cache lookup failed for {}: {}", provider, e);
                Vec::new()
            }
        }
    }

    pub fn stats(&self) -> MirrorStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stop accepting work, flush what is already queued (one attempt per
    /// entry) and wait for the task to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.worker.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("Shared cache mirror task ended abnormally: {}", e);
        }
    }
}

impl MirrorWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.receiver.recv() => match next {
                    Some(entry) => self.mirror(entry).await,
                    None => break,
                },
            }
        }

        self.receiver.close();
        while let Some(entry) = self.receiver.recv().await {
            self.mirror(entry).await;
        }

        let stats = self.stats.snapshot();
        info!(
            "Shared cache mirror stopped: {} mirrored, {} failed, {} dropped",
            stats.mirrored, stats.failed, stats.dropped
        );
    }

    async fn mirror(&self, entry: CacheEntry) {
        let attrs = CacheMetrics::provider_attrs(&entry.provider);
        let mut attempt = 1;

        loop {
            match self.shared_cache.put(&entry).await {
                Ok(()) => {
                    self.stats.mirrored.fetch_add(1, Ordering::Relaxed);
                    self.metrics.mirror_writes.add(1, &attrs);
                    return;
                }
                Err(SharedCacheError::Unavailable { message })
                    if attempt < self.max_attempts && !self.cancel.is_cancelled() =>
                {
                    let delay = backoff_with_jitter(self.retry_backoff, attempt);
                    debug!(
                        "Shared cache unavailable (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.max_attempts, delay, message
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    self.metrics
                        .mirror_failures
                        .add(1, &CacheMetrics::reason_attrs(&entry.provider, "write"));
                    debug!(
                        "Giving up mirroring {} after {} attempt(s): {}",
                        entry.url, attempt, e
                    );
                    return;
                }
            }
        }
    }
}
