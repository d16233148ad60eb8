//! Collaborator interfaces the cache depends on
//!
//! Release-name parsing, the show/episode registry, the bad-release filter
//! and the shared external cache all live outside this crate. The cache only
//! sees them through these traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{NameParseError, RegistryError, SharedCacheError};
use crate::models::{CacheEntry, EpisodeId, Quality, ShowId};

/// Result of parsing a release name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub series_name: String,
    pub quality: Quality,
    /// `None` when the release carries no season (absolute numbering)
    pub season: Option<i32>,
    pub episodes: Vec<u32>,
    /// Registry show the name resolved to, if any
    pub show_id: Option<ShowId>,
    pub release_group: String,
    pub version: i32,
}

/// Release-name parser
#[cfg_attr(test, mockall::automock)]
pub trait NameParser: Send + Sync {
    fn parse(&self, name: &str) -> Result<ParseResult, NameParseError>;
}

/// Bad-release content filter (ignored words, required words, ...)
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseFilter: Send + Sync {
    fn is_acceptable(&self, name: &str) -> bool;
}

/// One episode known to the registry
pub trait Episode: Send + Sync {
    fn id(&self) -> EpisodeId;
    fn season(&self) -> i32;
    fn episode(&self) -> u32;
    fn scene_season(&self) -> i32;
    fn scene_episode(&self) -> u32;

    /// Want-policy: is this episode still desired at `quality`
    fn want_episode(&self, quality: Quality, manual_search: bool, downgrade_quality: bool) -> bool;
}

/// One show known to the registry
pub trait Show: Send + Sync {
    fn id(&self) -> ShowId;
    fn name(&self) -> &str;
    fn is_anime(&self) -> bool;

    /// Provider listings use scene numbering for this show
    fn is_scene(&self) -> bool;

    fn get_episode(&self, season: i32, episode: u32) -> Result<Arc<dyn Episode>, RegistryError>;
}

/// Show/episode registry
pub trait ShowRegistry: Send + Sync {
    fn find_show(&self, show_id: ShowId) -> Option<Arc<dyn Show>>;

    /// Look up an episode by its registry id
    fn find_episode(
        &self,
        show_id: ShowId,
        episode_id: EpisodeId,
    ) -> Result<Arc<dyn Episode>, RegistryError>;
}

/// External cache shared between installations
///
/// Every failure is swallowed by the caller; implementations should not
/// retry internally.
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn put(&self, entry: &CacheEntry) -> Result<(), SharedCacheError>;

    async fn get(
        &self,
        provider: &str,
        show_id: ShowId,
        season: i32,
        episode: u32,
    ) -> Result<Vec<CacheEntry>, SharedCacheError>;
}
