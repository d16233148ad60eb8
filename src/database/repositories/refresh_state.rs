//! SeaORM-based repository for per-provider refresh timestamps

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

use super::stored_time;
use crate::entities::{prelude::ProviderRefreshState, provider_refresh_state};
use crate::errors::RepositoryResult;
use crate::models::RefreshState;

#[derive(Clone, Copy)]
enum Stamp {
    Update,
    Search,
}

/// SeaORM-based repository for `last_update` / `last_search` bookkeeping
#[derive(Clone, Debug)]
pub struct RefreshStateSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl RefreshStateSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Stored state for a provider, `None` if it has never been stamped
    pub async fn find(&self, provider: &str) -> RepositoryResult<Option<RefreshState>> {
        let now = Utc::now();
        let model = ProviderRefreshState::find_by_id(provider.to_string())
            .one(&*self.connection)
            .await?;

        Ok(model.map(|m| RefreshState {
            last_update: stored_time(m.last_update, now),
            last_search: stored_time(m.last_search, now),
        }))
    }

    /// Stored state, or the epoch-zero default when absent
    pub async fn get_or_default(&self, provider: &str) -> RepositoryResult<RefreshState> {
        Ok(self.find(provider).await?.unwrap_or_default())
    }

    pub async fn set_last_update(&self, provider: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.stamp(provider, Stamp::Update, at).await
    }

    pub async fn set_last_search(&self, provider: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.stamp(provider, Stamp::Search, at).await
    }

    async fn stamp(&self, provider: &str, which: Stamp, at: DateTime<Utc>) -> RepositoryResult<()> {
        let secs = at.timestamp();
        let mut active_model = provider_refresh_state::ActiveModel {
            provider: Set(provider.to_string()),
            ..Default::default()
        };
        let column = match which {
            Stamp::Update => {
                active_model.last_update = Set(Some(secs));
                provider_refresh_state::Column::LastUpdate
            }
            Stamp::Search => {
                active_model.last_search = Set(Some(secs));
                provider_refresh_state::Column::LastSearch
            }
        };

        ProviderRefreshState::insert(active_model)
            .on_conflict(
                OnConflict::column(provider_refresh_state::Column::Provider)
                    .update_column(column)
                    .to_owned(),
            )
            .exec(&*self.connection)
            .await?;

        Ok(())
    }
}
