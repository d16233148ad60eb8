//! SeaORM entities for the tables owned by the cache

pub mod prelude;

pub mod provider_cache;
pub mod provider_refresh_state;
