//! Per-provider listing cache
//!
//! [`TvCache`] owns one provider's slice of the cache: it decides when the
//! provider feed may be polled, ingests and validates listings, and matches
//! stored listings against the registry's want-policy.
//!
//! Refresh and clear follow two timestamps kept per provider:
//!
//! - `last_update`: when the feed was last fetched
//! - `last_search`: when the cache was last searched
//!
//! Stored listings are only cleared once `last_search >= last_update`, so a
//! refresh never throws away results that no search pass has seen yet.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TvCacheOptions;
use crate::context::CacheContext;
use crate::database::repositories::{ProviderCacheSeaOrmRepository, RefreshStateSeaOrmRepository};
use crate::errors::{AppError, AppResult, ProviderError};
use crate::models::{
    CacheEntry, EpisodeId, NO_SEASON, RefreshOutcome, RefreshState, SearchResult, SearchResults,
    ShowId,
};
use crate::observability::CacheMetrics;
use crate::services::SharedCacheMirror;
use crate::services::traits::{Episode, Show};
use crate::sources::{FeedItem, Provider};
use crate::utils::UrlUtils;

/// Season stored for releases that carry none
const DEFAULT_SEASON: i32 = 1;

/// Why a feed item or search candidate was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    InvalidUrl,
    PrivateUrl,
    Unparseable,
    UnknownShow,
    UnknownQuality,
    NoEpisodes,
    BadRelease,
    NotAnime,
    NoSeason,
    UnresolvedEpisode,
    NotWanted,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::PrivateUrl => "private_url",
            Self::Unparseable => "unparseable",
            Self::UnknownShow => "unknown_show",
            Self::UnknownQuality => "unknown_quality",
            Self::NoEpisodes => "no_episodes",
            Self::BadRelease => "bad_release",
            Self::NotAnime => "not_anime",
            Self::NoSeason => "no_season",
            Self::UnresolvedEpisode => "unresolved_episode",
            Self::NotWanted => "not_wanted",
        }
    }
}

/// Reject urls that are malformed or point into a private network
fn check_url(url: &str) -> Result<(), Rejection> {
    if UrlUtils::is_acceptable_listing(url) {
        Ok(())
    } else if UrlUtils::is_valid(url) {
        Err(Rejection::PrivateUrl)
    } else {
        Err(Rejection::InvalidUrl)
    }
}

/// A candidate that passed every match filter
#[derive(Debug)]
struct CandidateMatch {
    /// Every episode the release covers
    episode_ids: Vec<EpisodeId>,
    /// The subset still wanted at the release's quality, never empty
    wanted: Vec<EpisodeId>,
}

impl CandidateMatch {
    /// Group under the requested episode when it is wanted, otherwise under
    /// the first wanted sibling
    fn result_key(&self, requested: EpisodeId) -> EpisodeId {
        if self.wanted.contains(&requested) {
            requested
        } else {
            self.wanted.first().copied().unwrap_or(requested)
        }
    }
}

/// Listing cache for a single provider
pub struct TvCache {
    provider: Arc<dyn Provider>,
    options: TvCacheOptions,
    context: CacheContext,
    entries: ProviderCacheSeaOrmRepository,
    refresh_state: RefreshStateSeaOrmRepository,
}

impl TvCache {
    /// Cache using the options configured for this provider
    pub fn new(provider: Arc<dyn Provider>, context: CacheContext) -> Self {
        let options = context.config.cache.options_for(provider.id());
        Self::with_options(provider, context, options)
    }

    pub fn with_options(
        provider: Arc<dyn Provider>,
        context: CacheContext,
        options: TvCacheOptions,
    ) -> Self {
        let connection = context.database.connection();
        Self {
            provider,
            options,
            entries: ProviderCacheSeaOrmRepository::new(connection.clone()),
            refresh_state: RefreshStateSeaOrmRepository::new(connection),
            context,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn options(&self) -> &TvCacheOptions {
        &self.options
    }

    pub async fn refresh_state(&self) -> AppResult<RefreshState> {
        Ok(self.refresh_state.get_or_default(self.provider_id()).await?)
    }

    /// The minimum refresh interval has elapsed since the last update
    pub async fn should_update(&self) -> AppResult<bool> {
        let state = self.refresh_state().await?;
        Ok(self.update_due(&state, Utc::now()))
    }

    /// The previous batch has been searched at least once
    pub async fn should_clear_cache(&self) -> AppResult<bool> {
        Ok(self.refresh_state().await?.results_consumed())
    }

    fn update_due(&self, state: &RefreshState, now: DateTime<Utc>) -> bool {
        let interval =
            TimeDelta::from_std(self.options.min_refresh_interval).unwrap_or(TimeDelta::MAX);
        now - state.last_update >= interval
    }

    /// Fetch the provider feed and ingest it.
    ///
    /// Never returns an error: failures are reported through the outcome and
    /// the refresh is simply retried on the next pass.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let provider_id = self.provider_id();
        let attrs = CacheMetrics::provider_attrs(provider_id);

        if !force {
            match self.should_update().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{}: cache refresh not due yet", self.provider.name());
                    return RefreshOutcome::NotDue;
                }
                Err(e) => {
                    warn!("{}: could not read refresh state: {}", self.provider.name(), e);
                    return RefreshOutcome::Failed {
                        message: e.to_string(),
                    };
                }
            }
        }

        let started = Instant::now();
        self.context.metrics.refresh_total.add(1, &attrs);

        let outcome = self.fetch_and_ingest().await;

        self.context
            .metrics
            .refresh_duration
            .record(started.elapsed().as_secs_f64(), &attrs);
        if !outcome.succeeded() {
            self.context.metrics.refresh_failures.add(1, &attrs);
        }
        outcome
    }

    async fn fetch_and_ingest(&self) -> RefreshOutcome {
        let name = self.provider.name();

        match self.provider.login().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("{}: authentication failed, skipping cache refresh", name);
                return RefreshOutcome::AuthFailed {
                    message: "login refused".to_string(),
                };
            }
            Err(e) => return Self::fetch_failure(name, e),
        }

        let items = match self.provider.search(&self.options.search_criteria).await {
            Ok(items) => items,
            Err(e) => return Self::fetch_failure(name, e),
        };

        let cleared = match self.should_clear_cache().await {
            Ok(true) => match self.clear_entries().await {
                Ok(_) => true,
                Err(e) => return Self::store_failure(name, e),
            },
            Ok(false) => false,
            Err(e) => return Self::store_failure(name, e),
        };

        if let Err(e) = self
            .refresh_state
            .set_last_update(self.provider_id(), Utc::now())
            .await
        {
            return Self::store_failure(name, e.into());
        }

        let fetched = items.len();
        let mut added = 0;
        for item in &items {
            match self.ingest_item(item).await {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!("{}: failed to store feed item: {}", name, e),
            }
        }

        debug!(
            "{}: refreshed cache, {} fetched, {} added{}",
            name,
            fetched,
            added,
            if cleared { ", previous entries cleared" } else { "" }
        );

        RefreshOutcome::Refreshed {
            cleared,
            fetched,
            added,
        }
    }

    fn fetch_failure(name: &str, error: ProviderError) -> RefreshOutcome {
        if error.is_auth_failure() {
            warn!("{}: authentication failed, skipping cache refresh: {}", name, error);
            RefreshOutcome::AuthFailed {
                message: error.to_string(),
            }
        } else {
            debug!("{}: error while fetching feed: {}", name, error);
            warn!("{}: feed refresh skipped this cycle", name);
            RefreshOutcome::Failed {
                message: error.to_string(),
            }
        }
    }

    fn store_failure(name: &str, error: AppError) -> RefreshOutcome {
        warn!("{}: cache refresh failed: {}", name, error);
        RefreshOutcome::Failed {
            message: error.to_string(),
        }
    }

    /// Clear this provider's entries if they have been searched.
    ///
    /// Returns whether anything was cleared.
    pub async fn clear(&self) -> AppResult<bool> {
        if !self.should_clear_cache().await? {
            debug!(
                "{}: cache holds unsearched results, not clearing",
                self.provider.name()
            );
            return Ok(false);
        }
        self.clear_entries().await?;
        Ok(true)
    }

    async fn clear_entries(&self) -> AppResult<u64> {
        let removed = self.entries.clear_provider(self.provider_id()).await?;
        self.context
            .metrics
            .entries_cleared
            .add(removed, &CacheMetrics::provider_attrs(self.provider_id()));
        debug!("{}: cleared {} cached entries", self.provider.name(), removed);
        Ok(removed)
    }

    pub async fn entry_count(&self) -> AppResult<u64> {
        Ok(self.entries.count_for_provider(self.provider_id()).await?)
    }

    async fn ingest_item(&self, item: &FeedItem) -> AppResult<bool> {
        let (title, url) = self.provider.title_and_url(item);
        let (Some(title), Some(url)) = (title, url) else {
            debug!(
                "{}: the data returned from the feed is incomplete, this result is unusable",
                self.provider.name()
            );
            return Ok(false);
        };

        let title = title.replace(' ', ".");
        let url = url.replace("&amp;", "&");
        let (seeders, leechers) = self.provider.result_stats(item);
        let size = self.provider.size(item);

        self.add_cache_entry(&title, &url, seeders, leechers, size)
            .await
    }

    /// Validate, parse and store one listing.
    ///
    /// Returns `Ok(true)` when a new row was written. Duplicates and rejected
    /// listings return `Ok(false)`; only persistence failures are errors.
    pub async fn add_cache_entry(
        &self,
        name: &str,
        url: &str,
        seeders: i64,
        leechers: i64,
        size: i64,
    ) -> AppResult<bool> {
        let provider_id = self.provider_id();

        if self.entries.exists(provider_id, url).await? {
            return Ok(false);
        }

        let entry = match self.build_entry(name, url, seeders, leechers, size) {
            Ok(entry) => entry,
            Err(rejection) => {
                debug!("{}: rejected {} ({})", self.provider.name(), name, rejection.as_str());
                self.context
                    .metrics
                    .entries_rejected
                    .add(1, &CacheMetrics::reason_attrs(provider_id, rejection.as_str()));
                return Ok(false);
            }
        };

        if !self.entries.insert_if_absent(&entry).await? {
            return Ok(false);
        }

        debug!("Added RSS item: [{}] to cache: [{}]", entry.name, provider_id);
        self.context
            .metrics
            .entries_added
            .add(1, &CacheMetrics::provider_attrs(provider_id));

        if let Some(mirror) = self.shared_mirror() {
            mirror.enqueue(entry);
        }

        Ok(true)
    }

    fn build_entry(
        &self,
        name: &str,
        url: &str,
        seeders: i64,
        leechers: i64,
        size: i64,
    ) -> Result<CacheEntry, Rejection> {
        check_url(url)?;

        let parsed = self
            .context
            .parser
            .parse(name)
            .map_err(|_| Rejection::Unparseable)?;
        let show_id = parsed.show_id.ok_or(Rejection::UnknownShow)?;
        if !parsed.quality.is_known() {
            return Err(Rejection::UnknownQuality);
        }
        if parsed.episodes.is_empty() {
            return Err(Rejection::NoEpisodes);
        }

        Ok(CacheEntry {
            provider: self.provider_id().to_string(),
            name: name.to_string(),
            season: parsed.season.unwrap_or(DEFAULT_SEASON),
            episodes: parsed.episodes,
            show_id,
            url: url.to_string(),
            created_at: Utc::now(),
            quality: parsed.quality,
            release_group: parsed.release_group,
            version: parsed.version,
            seeders,
            leechers,
            size,
        })
    }

    fn shared_mirror(&self) -> Option<&SharedCacheMirror> {
        if !self.context.config.shared_cache.enabled || self.provider.is_private() {
            return None;
        }
        self.context.mirror.as_ref()
    }

    /// Find cached listings for one wanted episode.
    ///
    /// Matches are grouped by a wanted episode id in scan order: shared-cache
    /// rows first, then local rows by insertion. A multi-episode release is
    /// filed under `episode_id` only if that episode is itself wanted.
    ///
    /// `last_search` is stamped whatever the outcome, which is what later
    /// allows the next refresh to clear this batch.
    pub async fn search_cache(
        &self,
        show_id: ShowId,
        episode_id: EpisodeId,
        manual_search: bool,
        downgrade_quality: bool,
    ) -> AppResult<SearchResults> {
        self.context
            .metrics
            .searches_total
            .add(1, &CacheMetrics::provider_attrs(self.provider_id()));

        let results = self
            .find_results(show_id, episode_id, manual_search, downgrade_quality)
            .await;

        self.refresh_state
            .set_last_search(self.provider_id(), Utc::now())
            .await?;

        results
    }

    async fn find_results(
        &self,
        show_id: ShowId,
        episode_id: EpisodeId,
        manual_search: bool,
        downgrade_quality: bool,
    ) -> AppResult<SearchResults> {
        let mut results = SearchResults::new();
        let registry = &self.context.registry;

        let Some(show) = registry.find_show(show_id) else {
            warn!("{}: show {} is not in the registry", self.provider.name(), show_id);
            return Ok(results);
        };
        let target = match registry.find_episode(show_id, episode_id) {
            Ok(episode) => episode,
            Err(e) => {
                warn!("{}: cannot search cache: {}", self.provider.name(), e);
                return Ok(results);
            }
        };

        let (season, episode) = if show.is_scene() {
            (target.scene_season(), target.scene_episode())
        } else {
            (target.season(), target.episode())
        };

        let candidates = self.collect_candidates(show_id, season, episode).await?;
        let attrs = CacheMetrics::provider_attrs(self.provider_id());

        for candidate in candidates {
            match self.match_candidate(&candidate, manual_search, downgrade_quality) {
                Ok(matched) => {
                    info!("Found result {} at {}", candidate.name, candidate.url);
                    self.context.metrics.results_found.add(1, &attrs);
                    let key = matched.result_key(episode_id);
                    results.entry(key).or_default().push(SearchResult {
                        provider: candidate.provider,
                        show_id: candidate.show_id,
                        episode_ids: matched.episode_ids,
                        quality: candidate.quality,
                        release_group: candidate.release_group,
                        version: candidate.version,
                        name: candidate.name,
                        url: candidate.url,
                        seeders: candidate.seeders,
                        leechers: candidate.leechers,
                        size: candidate.size,
                    });
                }
                Err(rejection) => {
                    debug!(
                        "{}: skipping {} ({})",
                        self.provider.name(),
                        candidate.name,
                        rejection.as_str()
                    );
                    self.context.metrics.candidates_rejected.add(
                        1,
                        &CacheMetrics::reason_attrs(self.provider_id(), rejection.as_str()),
                    );
                }
            }
        }

        Ok(results)
    }

    /// Shared-cache rows first, then local rows, without repeating a url
    async fn collect_candidates(
        &self,
        show_id: ShowId,
        season: i32,
        episode: u32,
    ) -> AppResult<Vec<CacheEntry>> {
        let provider_id = self.provider_id();
        let mut candidates = match self.shared_mirror() {
            Some(mirror) => mirror.fetch(provider_id, show_id, season, episode).await,
            None => Vec::new(),
        };
        candidates.extend(
            self.entries
                .find_candidates(provider_id, show_id, season, episode)
                .await?,
        );

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.url.clone()));
        Ok(candidates)
    }

    /// Apply the match filters in order. Every stored episode number must
    /// resolve, and at least one of them must be wanted.
    fn match_candidate(
        &self,
        candidate: &CacheEntry,
        manual_search: bool,
        downgrade_quality: bool,
    ) -> Result<CandidateMatch, Rejection> {
        check_url(&candidate.url)?;
        if !self.context.release_filter.is_acceptable(&candidate.name) {
            return Err(Rejection::BadRelease);
        }

        let show: Arc<dyn Show> = self
            .context
            .registry
            .find_show(candidate.show_id)
            .ok_or(Rejection::UnknownShow)?;
        if self.provider.is_anime_only() && !show.is_anime() {
            return Err(Rejection::NotAnime);
        }
        if candidate.season == NO_SEASON {
            return Err(Rejection::NoSeason);
        }

        let episodes: Vec<Arc<dyn Episode>> = candidate
            .episodes
            .iter()
            .map(|&number| show.get_episode(candidate.season, number))
            .collect::<Result<_, _>>()
            .map_err(|_| Rejection::UnresolvedEpisode)?;

        let wanted: Vec<EpisodeId> = episodes
            .iter()
            .filter(|ep| ep.want_episode(candidate.quality, manual_search, downgrade_quality))
            .map(|ep| ep.id())
            .collect();
        if wanted.is_empty() {
            return Err(Rejection::NotWanted);
        }

        Ok(CandidateMatch {
            episode_ids: episodes.iter().map(|ep| ep.id()).collect(),
            wanted,
        })
    }
}
