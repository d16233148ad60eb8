//! SeaORM migrations for the provider cache schema

use sea_orm_migration::prelude::*;

pub mod m20261016_000001_provider_cache;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261016_000001_provider_cache::Migration)]
    }
}
