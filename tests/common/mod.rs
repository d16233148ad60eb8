//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tv_cache::CacheContext;
use tv_cache::config::Config;
use tv_cache::database::Database;
use tv_cache::errors::{
    NameParseError, ProviderError, ProviderResult, RegistryError, SharedCacheError,
};
use tv_cache::models::{CacheEntry, EpisodeId, Quality, ShowId};
use tv_cache::services::{
    Episode, NameParser, ParseResult, ReleaseFilter, SharedCache, Show, ShowRegistry, TvCache,
};
use tv_cache::sources::{FeedItem, Provider, SearchCriteria};

pub const SHOW_ID: ShowId = 100;
pub const ANIME_SHOW_ID: ShowId = 200;
pub const SCENE_SHOW_ID: ShowId = 300;

pub fn feed_item(title: &str, url: &str) -> FeedItem {
    json!({ "title": title, "link": url, "seeders": 10, "leechers": 1, "size": 734003200 })
}

// ---------------------------------------------------------------------------
// Provider

pub enum FeedBehavior {
    Items(Vec<FeedItem>),
    LoginRefused,
    AuthError,
    FetchError,
}

pub struct FakeProvider {
    pub id: String,
    pub private: bool,
    pub anime_only: bool,
    pub behavior: Mutex<FeedBehavior>,
    pub searches: AtomicUsize,
}

impl FakeProvider {
    pub fn new(id: &str, items: Vec<FeedItem>) -> Self {
        Self {
            id: id.to_string(),
            private: false,
            anime_only: false,
            behavior: Mutex::new(FeedBehavior::Items(items)),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: FeedBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn is_anime_only(&self) -> bool {
        self.anime_only
    }

    fn is_private(&self) -> bool {
        self.private
    }

    async fn login(&self) -> ProviderResult<bool> {
        Ok(!matches!(
            *self.behavior.lock().unwrap(),
            FeedBehavior::LoginRefused
        ))
    }

    async fn search(&self, _criteria: &SearchCriteria) -> ProviderResult<Vec<FeedItem>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match &*self.behavior.lock().unwrap() {
            FeedBehavior::Items(items) => Ok(items.clone()),
            FeedBehavior::LoginRefused => Ok(Vec::new()),
            FeedBehavior::AuthError => Err(ProviderError::auth_failed(&self.id, "invalid api key")),
            FeedBehavior::FetchError => Err(ProviderError::fetch(&self.id, "connection reset")),
        }
    }
}

// ---------------------------------------------------------------------------
// Name parser
//
// Understands `Series.Name.S01E02E03.720p.HDTV-GROUP` and `Series.Name.E05...`

pub struct FakeParser {
    shows: HashMap<String, ShowId>,
}

impl FakeParser {
    pub fn new() -> Self {
        Self {
            shows: HashMap::from([
                ("show name".to_string(), SHOW_ID),
                ("anime show".to_string(), ANIME_SHOW_ID),
                ("scene show".to_string(), SCENE_SHOW_ID),
                // Parses, but the registry does not know it
                ("ghost show".to_string(), 999),
            ]),
        }
    }
}

fn parse_episode_token(token: &str) -> Option<(Option<i32>, Vec<u32>)> {
    let upper = token.to_uppercase();
    let (season, rest) = if let Some(rest) = upper.strip_prefix('S') {
        let split = rest.find('E')?;
        (Some(rest[..split].parse().ok()?), &rest[split..])
    } else {
        (None, upper.as_str())
    };
    let episodes: Option<Vec<u32>> = rest
        .split('E')
        .skip(1)
        .map(|ep| ep.parse().ok())
        .collect();
    let episodes = episodes?;
    if !rest.starts_with('E') || episodes.is_empty() {
        return None;
    }
    Some((season, episodes))
}

impl NameParser for FakeParser {
    fn parse(&self, name: &str) -> Result<ParseResult, NameParseError> {
        let tokens: Vec<&str> = name.split('.').collect();
        let Some(position) = tokens.iter().position(|t| parse_episode_token(t).is_some()) else {
            return Err(NameParseError::InvalidName {
                name: name.to_string(),
            });
        };
        let (season, episodes) = parse_episode_token(tokens[position]).unwrap_or_default();
        let series_name = tokens[..position].join(" ");

        let show_id = self.shows.get(&series_name.to_lowercase()).copied();
        if show_id.is_none() {
            return Err(NameParseError::InvalidShow {
                name: name.to_string(),
            });
        }

        let quality = if name.contains("2160p") {
            Quality::Uhd4kTv
        } else if name.contains("1080p") {
            Quality::FullHdTv
        } else if name.contains("720p") {
            Quality::HdTv
        } else if name.contains("HDTV") || name.contains("SDTV") {
            Quality::SdTv
        } else {
            Quality::Unknown
        };

        let release_group = name
            .rsplit_once('-')
            .map(|(_, group)| group.to_string())
            .unwrap_or_default();

        Ok(ParseResult {
            series_name,
            quality,
            season,
            episodes,
            show_id,
            release_group,
            version: -1,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry

pub struct FakeEpisode {
    pub id: EpisodeId,
    pub season: i32,
    pub episode: u32,
    pub scene_season: i32,
    pub scene_episode: u32,
    pub wanted: Mutex<Vec<Quality>>,
}

impl FakeEpisode {
    pub fn new(id: EpisodeId, season: i32, episode: u32, wanted: Vec<Quality>) -> Self {
        Self {
            id,
            season,
            episode,
            scene_season: season,
            scene_episode: episode,
            wanted: Mutex::new(wanted),
        }
    }
}

impl Episode for FakeEpisode {
    fn id(&self) -> EpisodeId {
        self.id
    }

    fn season(&self) -> i32 {
        self.season
    }

    fn episode(&self) -> u32 {
        self.episode
    }

    fn scene_season(&self) -> i32 {
        self.scene_season
    }

    fn scene_episode(&self) -> u32 {
        self.scene_episode
    }

    /// Wanted at a listed quality, or at any quality on a manual search
    fn want_episode(&self, quality: Quality, manual_search: bool, _downgrade_quality: bool) -> bool {
        manual_search || self.wanted.lock().unwrap().contains(&quality)
    }
}

pub struct FakeShow {
    pub id: ShowId,
    pub name: String,
    pub anime: bool,
    pub scene: bool,
    pub episodes: Vec<Arc<FakeEpisode>>,
}

impl Show for FakeShow {
    fn id(&self) -> ShowId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_anime(&self) -> bool {
        self.anime
    }

    fn is_scene(&self) -> bool {
        self.scene
    }

    fn get_episode(&self, season: i32, episode: u32) -> Result<Arc<dyn Episode>, RegistryError> {
        self.episodes
            .iter()
            .find(|ep| ep.season == season && ep.episode == episode)
            .map(|ep| ep.clone() as Arc<dyn Episode>)
            .ok_or(RegistryError::EpisodeNotFound {
                show_id: self.id,
                season,
                episode,
            })
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub shows: HashMap<ShowId, Arc<FakeShow>>,
}

impl FakeRegistry {
    /// Three shows:
    /// - `SHOW_ID`: S01E01-E03 (ids 1001-1003), wanted at 720p
    /// - `ANIME_SHOW_ID`: anime, S01E01 (id 2001), wanted at 720p
    /// - `SCENE_SHOW_ID`: scene numbered, S02E05 is scene S01E01 (id 3001)
    pub fn standard() -> Self {
        let mut shows = HashMap::new();
        shows.insert(
            SHOW_ID,
            Arc::new(FakeShow {
                id: SHOW_ID,
                name: "Show Name".to_string(),
                anime: false,
                scene: false,
                episodes: (1..=3)
                    .map(|ep| Arc::new(FakeEpisode::new(1000 + ep as u64, 1, ep, vec![Quality::HdTv])))
                    .collect(),
            }),
        );
        shows.insert(
            ANIME_SHOW_ID,
            Arc::new(FakeShow {
                id: ANIME_SHOW_ID,
                name: "Anime Show".to_string(),
                anime: true,
                scene: false,
                episodes: vec![Arc::new(FakeEpisode::new(2001, 1, 1, vec![Quality::HdTv]))],
            }),
        );
        shows.insert(
            SCENE_SHOW_ID,
            Arc::new(FakeShow {
                id: SCENE_SHOW_ID,
                name: "Scene Show".to_string(),
                anime: false,
                scene: true,
                episodes: vec![
                    Arc::new(FakeEpisode {
                        scene_season: 1,
                        scene_episode: 1,
                        ..FakeEpisode::new(3001, 2, 5, vec![Quality::HdTv])
                    }),
                    // Scene S01E01 listings resolve against the registry's own S01E01
                    Arc::new(FakeEpisode::new(3002, 1, 1, vec![Quality::HdTv])),
                ],
            }),
        );
        Self { shows }
    }
}

impl FakeRegistry {
    /// Stop wanting an episode of `SHOW_ID` at any quality
    pub fn unwant(&self, episode_id: EpisodeId) {
        for episode in &self.shows[&SHOW_ID].episodes {
            if episode.id == episode_id {
                episode.wanted.lock().unwrap().clear();
            }
        }
    }
}

impl ShowRegistry for FakeRegistry {
    fn find_show(&self, show_id: ShowId) -> Option<Arc<dyn Show>> {
        self.shows
            .get(&show_id)
            .map(|show| show.clone() as Arc<dyn Show>)
    }

    fn find_episode(
        &self,
        show_id: ShowId,
        episode_id: EpisodeId,
    ) -> Result<Arc<dyn Episode>, RegistryError> {
        self.shows
            .get(&show_id)
            .and_then(|show| show.episodes.iter().find(|ep| ep.id == episode_id))
            .map(|ep| ep.clone() as Arc<dyn Episode>)
            .ok_or(RegistryError::EpisodeIdNotFound {
                show_id,
                episode_id,
            })
    }
}

// ---------------------------------------------------------------------------
// Release filter

/// Rejects names containing any blocked word
#[derive(Default)]
pub struct WordFilter {
    pub blocked: Vec<String>,
}

impl ReleaseFilter for WordFilter {
    fn is_acceptable(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        !self.blocked.iter().any(|word| lower.contains(word))
    }
}

// ---------------------------------------------------------------------------
// Shared cache

#[derive(Default)]
pub struct FakeSharedCache {
    pub stored: Mutex<Vec<CacheEntry>>,
    pub offline: AtomicBool,
    /// Answer every lookup with all of the provider's rows
    pub loose: AtomicBool,
}

#[async_trait]
impl SharedCache for FakeSharedCache {
    async fn put(&self, entry: &CacheEntry) -> Result<(), SharedCacheError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SharedCacheError::Unavailable {
                message: "offline".to_string(),
            });
        }
        self.stored.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn get(
        &self,
        provider: &str,
        show_id: ShowId,
        season: i32,
        episode: u32,
    ) -> Result<Vec<CacheEntry>, SharedCacheError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SharedCacheError::Unavailable {
                message: "offline".to_string(),
            });
        }
        let loose = self.loose.load(Ordering::SeqCst);
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.provider == provider
                    && (loose
                        || (e.show_id == show_id
                            && e.season == season
                            && e.contains_episode(episode)))
            })
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Wiring

pub async fn context_with(config: Config, filter: WordFilter) -> CacheContext {
    context_with_registry(config, filter, FakeRegistry::standard()).await
}

pub async fn context_with_registry(
    config: Config,
    filter: WordFilter,
    registry: FakeRegistry,
) -> CacheContext {
    let database = Database::connect_in_memory().await.unwrap();
    CacheContext::new(
        config,
        database,
        Arc::new(FakeParser::new()),
        Arc::new(registry),
        Arc::new(filter),
    )
}

pub async fn context() -> CacheContext {
    context_with(Config::default(), WordFilter::default()).await
}

pub fn shared_cache_config() -> Config {
    let mut config = Config::default();
    config.shared_cache.enabled = true;
    config.shared_cache.max_attempts = 1;
    config.shared_cache.retry_backoff = Duration::from_millis(1);
    config
}

pub fn tv_cache(provider: Arc<FakeProvider>, context: CacheContext) -> Arc<TvCache> {
    Arc::new(TvCache::new(provider, context))
}
