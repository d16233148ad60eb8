//! Priority work queue with a single coordinating loop
//!
//! Pending items are ordered by the composite key `(priority, sequence)`:
//! ascending priority value, then submission order. A plain priority
//! comparison would not keep equal priorities first-in-first-out because
//! `BinaryHeap` is not stable.
//!
//! The loop runs at most one job at a time. Each job body is spawned on its
//! own task so the loop keeps observing pause/stop while it runs; the loop
//! wakes every `poll_interval`, which bounds how quickly pause, stop and new
//! submissions are noticed.

use chrono::Utc;
use futures::future::BoxFuture;
use std::any::Any;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle as TaskHandle;
use tracing::{debug, error, info, warn};

use super::types::{Job, JobHandle, PAUSED_PRIORITY, QueuePriority, WorkItem, normalize_name};
use crate::config::QueueConfig;
use crate::errors::QueueError;

type BoxedJob = Box<dyn FnOnce(WorkItem) -> BoxFuture<'static, ()> + Send>;

struct PendingItem {
    priority: QueuePriority,
    seq: u64,
    item: WorkItem,
    run: BoxedJob,
}

impl PendingItem {
    fn key(&self) -> (QueuePriority, u64) {
        (self.priority, self.seq)
    }
}

impl PartialEq for PendingItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PendingItem {}

impl PartialOrd for PendingItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingItem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key().cmp(&other.key())
    }
}

/// Pending and in-flight sets share one lock so a snapshot is consistent.
/// The stop flag lives under the same lock: a submission either lands
/// before the loop's final drained check or is refused.
#[derive(Default)]
struct QueueState {
    pending: BinaryHeap<Reverse<PendingItem>>,
    in_flight: Option<WorkItem>,
    next_seq: u64,
    stopping: bool,
}

impl QueueState {
    fn drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_none()
    }
}

struct QueueInner {
    name: String,
    state: Mutex<QueueState>,
    min_priority: AtomicU8,
    active: AtomicBool,
    poll_interval: Duration,
}

impl QueueInner {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_paused(&self) -> bool {
        self.min_priority.load(Ordering::SeqCst) == PAUSED_PRIORITY
    }

    /// Take the next item if the worker slot is free and dequeues are allowed
    fn dequeue(&self) -> Option<(WorkItem, BoxedJob)> {
        let mut state = self.state();
        if state.in_flight.is_some() {
            return None;
        }
        // Stopping drains even a paused queue
        if self.is_paused() && !state.stopping {
            return None;
        }

        let Reverse(next) = state.pending.pop()?;
        let mut in_flight = next.item.clone();
        in_flight.in_progress = true;
        state.in_flight = Some(in_flight);
        Some((next.item, next.run))
    }

    fn finish(&self) {
        self.state().in_flight = None;
    }

    fn drained(&self) -> bool {
        self.state().drained()
    }

    fn stopped_and_drained(&self) -> bool {
        let state = self.state();
        state.stopping && state.drained()
    }
}

/// Single-worker priority queue
pub struct PriorityWorkQueue {
    inner: Arc<QueueInner>,
    runner: Mutex<Option<TaskHandle<()>>>,
}

impl PriorityWorkQueue {
    pub fn new(name: impl AsRef<str>, config: &QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                name: normalize_name(name.as_ref()),
                state: Mutex::new(QueueState::default()),
                min_priority: AtomicU8::new(0),
                active: AtomicBool::new(false),
                poll_interval: config.poll_interval.max(Duration::from_millis(1)),
            }),
            runner: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Spawn the coordinating loop. Calling it again is a no-op.
    pub fn start(&self) {
        let mut runner = self.runner.lock().unwrap_or_else(PoisonError::into_inner);
        if runner.is_some() {
            return;
        }
        self.inner.active.store(true, Ordering::SeqCst);
        let inner = self.inner.clone();
        *runner = Some(tokio::spawn(Self::run(inner)));
        info!("Started queue {}", self.inner.name);
    }

    /// Queue a job. Returns `None` without queueing when the queue is
    /// stopping.
    pub fn submit<J: Job>(&self, item: WorkItem, job: J) -> Option<JobHandle<J::Output>> {
        self.submit_fn(item, move |item| job.run(item))
    }

    /// Queue a closure as a job
    pub fn submit_fn<F, Fut>(&self, mut item: WorkItem, job: F) -> Option<JobHandle<Fut::Output>>
    where
        F: FnOnce(WorkItem) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        item.name = format!("{}-{}", self.inner.name, item.name);
        item.added = Some(Utc::now());
        item.in_progress = false;

        let (sender, receiver) = oneshot::channel();
        let handle = JobHandle::new(&item, receiver);
        let item_name = item.name.clone();

        let run: BoxedJob = Box::new(move |item| {
            Box::pin(async move {
                let result = match tokio::spawn(job(item)).await {
                    Ok(output) => Ok(output),
                    Err(e) if e.is_panic() => {
                        let message = panic_message(e.into_panic());
                        error!("Job {} panicked: {}", item_name, message);
                        Err(QueueError::JobPanicked {
                            item: item_name,
                            message,
                        })
                    }
                    Err(_) => Err(QueueError::ResultDropped { item: item_name }),
                };
                // The submitter may have dropped its handle
                let _ = sender.send(result);
            })
        });

        let mut state = self.inner.state();
        if state.stopping {
            debug!("Queue {} is stopping, ignoring {}", self.inner.name, item.name);
            return None;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        debug!(
            "Queued {} (priority {}, #{})",
            item.name, item.priority, seq
        );
        state.pending.push(Reverse(PendingItem {
            priority: item.priority,
            seq,
            item,
            run,
        }));

        Some(handle)
    }

    /// Withhold new dequeues from the next loop iteration on
    pub fn pause(&self) {
        info!("Pausing queue {}", self.inner.name);
        self.inner.min_priority.store(PAUSED_PRIORITY, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        info!("Unpausing queue {}", self.inner.name);
        self.inner.min_priority.store(0, Ordering::SeqCst);
    }

    /// Refuse new submissions and let the loop exit once everything queued
    /// has run
    pub fn stop(&self) {
        let mut state = self.inner.state();
        if !state.stopping {
            state.stopping = true;
            info!("Stopping queue {}", self.inner.name);
        }
    }

    /// Stop and wait for the loop to drain and exit. A queue that was never
    /// started discards its pending items, resolving their handles with
    /// `QueueError::ResultDropped`.
    pub async fn shutdown(&self) {
        self.stop();
        let runner = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match runner {
            Some(runner) => {
                if let Err(e) = runner.await {
                    error!("Queue {} loop ended abnormally: {}", self.inner.name, e);
                }
            }
            None => {
                let discarded = std::mem::take(&mut self.inner.state().pending);
                if !discarded.is_empty() {
                    warn!(
                        "Queue {} was never started, discarding {} items",
                        self.inner.name,
                        discarded.len()
                    );
                }
            }
        }
    }

    /// Consistent snapshot: the in-flight item first, then pending items in
    /// dequeue order
    pub fn queue_items(&self) -> Vec<WorkItem> {
        let state = self.inner.state();
        let mut pending: Vec<&PendingItem> = state.pending.iter().map(|r| &r.0).collect();
        pending.sort();

        state
            .in_flight
            .iter()
            .cloned()
            .chain(pending.into_iter().map(|p| p.item.clone()))
            .collect()
    }

    pub fn is_busy(&self) -> bool {
        !self.inner.drained()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.is_paused()
    }

    /// The coordinating loop is running
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    async fn run(inner: Arc<QueueInner>) {
        let mut worker: Option<TaskHandle<()>> = None;

        loop {
            if worker.as_ref().is_some_and(|w| w.is_finished())
                && let Some(finished) = worker.take()
                && let Err(e) = finished.await
            {
                // Job panics are caught one level down; this is the wrapper
                warn!("Queue {} worker ended abnormally: {}", inner.name, e);
                inner.finish();
            }

            if inner.stopped_and_drained() {
                break;
            }

            if let Some((item, run)) = inner.dequeue() {
                debug!("Queue {} running {}", inner.name, item.name);
                let worker_inner = inner.clone();
                worker = Some(tokio::spawn(async move {
                    let started = Instant::now();
                    let name = item.name.clone();
                    run(item).await;
                    worker_inner.finish();
                    debug!("{} finished in {:?}", name, started.elapsed());
                }));
            }

            tokio::time::sleep(inner.poll_interval).await;
        }

        inner.active.store(false, Ordering::SeqCst);
        info!("Queue {} stopped", inner.name);
    }
}

impl Drop for PriorityWorkQueue {
    fn drop(&mut self) {
        if let Some(runner) = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            runner.abort();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
