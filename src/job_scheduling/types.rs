//! Work queue type definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumIter};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::QueueError;

/// Priority levels for queued work. Lower values run first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum QueuePriority {
    /// Manual or recovery work that must jump the queue
    #[strum(to_string = "EXTREME")]
    Extreme = 5,
    #[strum(to_string = "HIGH")]
    High = 10,
    /// Regular scheduled work
    #[strum(to_string = "NORMAL")]
    Normal = 20,
    /// Background work
    #[strum(to_string = "LOW")]
    Low = 30,
}

/// Threshold value meaning "dequeue nothing"
pub const PAUSED_PRIORITY: u8 = 99;

impl QueuePriority {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl PartialOrd for QueuePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_u8().cmp(&other.as_u8())
    }
}

/// Normalise a queue or item name: spaces become `-`, letters upper-case
pub fn normalize_name(name: &str) -> String {
    name.trim().replace(' ', "-").to_uppercase()
}

/// A named, prioritised unit of work
///
/// `added` is stamped and the name prefixed with the queue name on submit.
/// `in_progress` is only ever true on the in-flight copy the queue reports
/// through its snapshot.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub name: String,
    pub priority: QueuePriority,
    pub action_id: Uuid,
    /// Cooperative stop flag; the job decides when to look at it
    pub stop: CancellationToken,
    pub added: Option<DateTime<Utc>>,
    pub in_progress: bool,
}

impl WorkItem {
    pub fn new(name: impl AsRef<str>, priority: QueuePriority) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            priority,
            action_id: Uuid::new_v4(),
            stop: CancellationToken::new(),
            added: None,
            in_progress: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// A job body run by the queue
///
/// Jobs are expected to handle their own errors and report them in
/// `Output`. A panic is caught at the worker boundary and surfaces as
/// [`QueueError::JobPanicked`] on the [`JobHandle`]; it is never retried.
#[async_trait]
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    async fn run(self, item: WorkItem) -> Self::Output;
}

/// Per-item result handle returned by `submit`
#[derive(Debug)]
pub struct JobHandle<T> {
    name: String,
    action_id: Uuid,
    stop: CancellationToken,
    receiver: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(item: &WorkItem, receiver: oneshot::Receiver<Result<T, QueueError>>) -> Self {
        Self {
            name: item.name.clone(),
            action_id: item.action_id,
            stop: item.stop.clone(),
            receiver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_id(&self) -> Uuid {
        self.action_id
    }

    /// Set the item's stop flag. A pending item stays queued and sees the
    /// flag when it runs; a running job is never interrupted.
    pub fn cancel(&self) {
        self.stop.cancel();
    }

    /// Wait for the job to finish
    pub async fn result(self) -> Result<T, QueueError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(QueueError::ResultDropped { item: self.name }),
        }
    }
}
