//! SeaORM-based repository for cached provider listings

use chrono::DateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::warn;

use crate::entities::{prelude::ProviderCache, provider_cache};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{CacheEntry, Quality, ShowId, decode_episodes, encode_episodes, episode_pattern};

/// SeaORM-based repository for the provider cache table
#[derive(Clone, Debug)]
pub struct ProviderCacheSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ProviderCacheSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Whether a row already exists for `(provider, url)`
    pub async fn exists(&self, provider: &str, url: &str) -> RepositoryResult<bool> {
        let count = ProviderCache::find()
            .filter(provider_cache::Column::Provider.eq(provider))
            .filter(provider_cache::Column::Url.eq(url))
            .count(&*self.connection)
            .await?;
        Ok(count > 0)
    }

    /// Insert an entry unless `(provider, url)` is already cached.
    ///
    /// The existence check and the insert share one transaction. Returns
    /// `true` when a row was written.
    pub async fn insert_if_absent(&self, entry: &CacheEntry) -> RepositoryResult<bool> {
        let txn = self.connection.begin().await?;

        let existing = ProviderCache::find()
            .filter(provider_cache::Column::Provider.eq(entry.provider.as_str()))
            .filter(provider_cache::Column::Url.eq(entry.url.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Ok(false);
        }

        let show_id = i64::try_from(entry.show_id)
            .map_err(|_| RepositoryError::invalid_value("provider_cache", "show_id", entry.show_id))?;

        let active_model = provider_cache::ActiveModel {
            provider: Set(entry.provider.clone()),
            name: Set(entry.name.clone()),
            season: Set(entry.season),
            episodes: Set(encode_episodes(&entry.episodes)),
            show_id: Set(show_id),
            url: Set(entry.url.clone()),
            time: Set(entry.created_at.timestamp()),
            quality: Set(entry.quality.as_i32()),
            release_group: Set(entry.release_group.clone()),
            version: Set(entry.version),
            seeders: Set(entry.seeders),
            leechers: Set(entry.leechers),
            size: Set(entry.size),
            ..Default::default()
        };
        active_model.insert(&txn).await?;
        txn.commit().await?;

        Ok(true)
    }

    /// Delete every cached row for a provider, returning the number removed
    pub async fn clear_provider(&self, provider: &str) -> RepositoryResult<u64> {
        let result = ProviderCache::delete_many()
            .filter(provider_cache::Column::Provider.eq(provider))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    /// Rows for `(provider, show, season)` whose episode list contains
    /// `episode`, in insertion order.
    ///
    /// Rows that cannot be mapped back into a [`CacheEntry`] are logged and
    /// skipped.
    pub async fn find_candidates(
        &self,
        provider: &str,
        show_id: ShowId,
        season: i32,
        episode: u32,
    ) -> RepositoryResult<Vec<CacheEntry>> {
        let show_id = i64::try_from(show_id)
            .map_err(|_| RepositoryError::invalid_value("provider_cache", "show_id", show_id))?;

        let models = ProviderCache::find()
            .filter(provider_cache::Column::Provider.eq(provider))
            .filter(provider_cache::Column::ShowId.eq(show_id))
            .filter(provider_cache::Column::Season.eq(season))
            .filter(provider_cache::Column::Episodes.contains(episode_pattern(episode)))
            .order_by_asc(provider_cache::Column::Id)
            .all(&*self.connection)
            .await?;

        Ok(models
            .into_iter()
            .filter_map(|model| {
                let id = model.id;
                match Self::model_to_domain(model) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable cache row {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    /// Number of cached rows for a provider
    pub async fn count_for_provider(&self, provider: &str) -> RepositoryResult<u64> {
        Ok(ProviderCache::find()
            .filter(provider_cache::Column::Provider.eq(provider))
            .count(&*self.connection)
            .await?)
    }

    /// All cached rows for a provider, in insertion order
    pub async fn find_by_provider(&self, provider: &str) -> RepositoryResult<Vec<CacheEntry>> {
        ProviderCache::find()
            .filter(provider_cache::Column::Provider.eq(provider))
            .order_by_asc(provider_cache::Column::Id)
            .all(&*self.connection)
            .await?
            .into_iter()
            .map(Self::model_to_domain)
            .collect()
    }

    fn model_to_domain(model: provider_cache::Model) -> RepositoryResult<CacheEntry> {
        let episodes = decode_episodes(&model.episodes)
            .ok_or_else(|| RepositoryError::invalid_value("provider_cache", "episodes", &model.episodes))?;
        let quality = Quality::try_from(model.quality)
            .map_err(|v| RepositoryError::invalid_value("provider_cache", "quality", v))?;
        let show_id = ShowId::try_from(model.show_id)
            .map_err(|_| RepositoryError::invalid_value("provider_cache", "show_id", model.show_id))?;
        let created_at = DateTime::from_timestamp(model.time, 0)
            .ok_or_else(|| RepositoryError::invalid_value("provider_cache", "time", model.time))?;

        Ok(CacheEntry {
            provider: model.provider,
            name: model.name,
            season: model.season,
            episodes,
            show_id,
            url: model.url,
            created_at,
            quality,
            release_group: model.release_group,
            version: model.version,
            seeders: model.seeders,
            leechers: model.leechers,
            size: model.size,
        })
    }
}
