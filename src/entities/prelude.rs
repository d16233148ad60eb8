pub use super::provider_cache::Entity as ProviderCache;
pub use super::provider_refresh_state::Entity as ProviderRefreshState;
