//! Built-in cache jobs
//!
//! Both jobs honour their item's stop flag only before they start; once a
//! refresh or search is underway it runs to completion.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{Job, QueuePriority, WorkItem};
use crate::errors::AppResult;
use crate::models::{EpisodeId, RefreshOutcome, SearchResults, ShowId};
use crate::services::TvCache;

/// Result of a built-in job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    /// The stop flag was set before the job started
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Refresh one provider's cache
pub struct CacheRefreshJob {
    cache: Arc<TvCache>,
    force: bool,
}

impl CacheRefreshJob {
    pub fn new(cache: Arc<TvCache>, force: bool) -> Self {
        Self { cache, force }
    }

    /// Work item named after the provider, e.g. `REFRESH-EZTV`
    pub fn work_item(&self, priority: QueuePriority) -> WorkItem {
        WorkItem::new(format!("refresh {}", self.cache.provider_id()), priority)
    }
}

#[async_trait]
impl Job for CacheRefreshJob {
    type Output = JobOutcome<RefreshOutcome>;

    async fn run(self, item: WorkItem) -> Self::Output {
        if item.is_stopped() {
            debug!("{} was cancelled before it started", item.name);
            return JobOutcome::Cancelled;
        }

        let outcome = self.cache.refresh(self.force).await;
        if outcome.is_auth_failure() {
            info!(
                "{}: provider {} needs attention before it can be refreshed",
                item.name,
                self.cache.provider_id()
            );
        }
        JobOutcome::Completed(outcome)
    }
}

/// Search one provider's cache for a wanted episode
pub struct CacheSearchJob {
    cache: Arc<TvCache>,
    show_id: ShowId,
    episode_id: EpisodeId,
    manual_search: bool,
    downgrade_quality: bool,
}

impl CacheSearchJob {
    pub fn new(cache: Arc<TvCache>, show_id: ShowId, episode_id: EpisodeId) -> Self {
        Self {
            cache,
            show_id,
            episode_id,
            manual_search: false,
            downgrade_quality: false,
        }
    }

    pub fn manual(mut self, manual_search: bool) -> Self {
        self.manual_search = manual_search;
        self
    }

    pub fn downgrade_quality(mut self, downgrade_quality: bool) -> Self {
        self.downgrade_quality = downgrade_quality;
        self
    }

    pub fn work_item(&self, priority: QueuePriority) -> WorkItem {
        let kind = if self.manual_search { "manual" } else { "search" };
        WorkItem::new(
            format!(
                "{} {} {}-{}",
                kind,
                self.cache.provider_id(),
                self.show_id,
                self.episode_id
            ),
            priority,
        )
    }
}

#[async_trait]
impl Job for CacheSearchJob {
    type Output = JobOutcome<AppResult<SearchResults>>;

    async fn run(self, item: WorkItem) -> Self::Output {
        if item.is_stopped() {
            debug!("{} was cancelled before it started", item.name);
            return JobOutcome::Cancelled;
        }

        JobOutcome::Completed(
            self.cache
                .search_cache(
                    self.show_id,
                    self.episode_id,
                    self.manual_search,
                    self.downgrade_quality,
                )
                .await,
        )
    }
}
