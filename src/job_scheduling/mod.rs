//! Priority work queue
//!
//! A generic scheduler that accepts named, prioritised jobs and runs them
//! one at a time per queue instance. Parallelism comes from running several
//! queues, not from fan-out inside one.
//!
//! - [`PriorityWorkQueue`]: pending set, coordinating loop, pause/resume/stop
//! - [`WorkItem`] / [`JobHandle`]: what is submitted and what comes back
//! - [`CacheRefreshJob`] / [`CacheSearchJob`]: jobs driving a [`crate::services::TvCache`]

pub mod jobs;
pub mod priority_queue;
pub mod types;

pub use jobs::{CacheRefreshJob, CacheSearchJob, JobOutcome};
pub use priority_queue::PriorityWorkQueue;
pub use types::{Job, JobHandle, PAUSED_PRIORITY, QueuePriority, WorkItem};
