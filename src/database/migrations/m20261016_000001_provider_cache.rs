//! Create the provider cache and per-provider refresh state tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_provider_cache_table(manager).await?;
        self.create_provider_refresh_state_table(manager).await?;
        self.create_indexes(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderRefreshState::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderCache::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_provider_cache_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderCache::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderCache::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderCache::Provider).string().not_null())
                    .col(ColumnDef::new(ProviderCache::Name).text().not_null())
                    .col(ColumnDef::new(ProviderCache::Season).integer().not_null())
                    .col(ColumnDef::new(ProviderCache::Episodes).string().not_null())
                    .col(ColumnDef::new(ProviderCache::ShowId).big_integer().not_null())
                    .col(ColumnDef::new(ProviderCache::Url).text().not_null())
                    .col(ColumnDef::new(ProviderCache::Time).big_integer().not_null())
                    .col(ColumnDef::new(ProviderCache::Quality).integer().not_null())
                    .col(
                        ColumnDef::new(ProviderCache::ReleaseGroup)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProviderCache::Version)
                            .integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(ProviderCache::Seeders)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(ProviderCache::Leechers)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(ProviderCache::Size)
                            .big_integer()
                            .not_null()
                            .default(-1),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_provider_refresh_state_table(
        &self,
        manager: &SchemaManager<'_>,
    ) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProviderRefreshState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderRefreshState::Provider)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProviderRefreshState::LastUpdate).big_integer())
                    .col(ColumnDef::new(ProviderRefreshState::LastSearch).big_integer())
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        // One row per (provider, url)
        manager
            .create_index(
                Index::create()
                    .name("idx_provider_cache_provider_url")
                    .table(ProviderCache::Table)
                    .col(ProviderCache::Provider)
                    .col(ProviderCache::Url)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Match lookups filter by (provider, show, season)
        manager
            .create_index(
                Index::create()
                    .name("idx_provider_cache_lookup")
                    .table(ProviderCache::Table)
                    .col(ProviderCache::Provider)
                    .col(ProviderCache::ShowId)
                    .col(ProviderCache::Season)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProviderCache {
    Table,
    Id,
    Provider,
    Name,
    Season,
    Episodes,
    ShowId,
    Url,
    Time,
    Quality,
    ReleaseGroup,
    Version,
    Seeders,
    Leechers,
    Size,
}

#[derive(DeriveIden)]
enum ProviderRefreshState {
    Table,
    Provider,
    LastUpdate,
    LastSearch,
}
