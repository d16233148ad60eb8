//! Error type definitions for the provider cache
//!
//! This module defines all error types used throughout the crate, providing a
//! hierarchical error system that keeps "skip this unit of work" failures
//! distinguishable from genuine persistence problems.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Provider handling errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored data that cannot be mapped back into the domain model
    #[error("Invalid stored value: {table}.{field} = {value}")]
    InvalidValue {
        table: String,
        field: String,
        value: String,
    },
}

/// Provider fetch errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected our credentials
    #[error("Authentication failed: {provider} - {message}")]
    AuthenticationFailed { provider: String, message: String },

    /// Network or transport failure while fetching listings
    #[error("Fetch failed: {provider} - {message}")]
    Fetch { provider: String, message: String },

    /// The provider answered but the payload could not be understood
    #[error("Parse error: {provider} - {message}")]
    Parse { provider: String, message: String },
}

/// Release name parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameParseError {
    /// The name does not look like a release name at all
    #[error("Invalid release name: {name}")]
    InvalidName { name: String },

    /// The name parsed but does not belong to a known show
    #[error("Unknown show for release: {name}")]
    InvalidShow { name: String },
}

/// Show/episode registry lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Episode not found: show {show_id} S{season:02}E{episode:02}")]
    EpisodeNotFound {
        show_id: u64,
        season: i32,
        episode: u32,
    },

    #[error("Episode not found: show {show_id} episode id {episode_id}")]
    EpisodeIdNotFound { show_id: u64, episode_id: u64 },
}

/// External shared cache failures (always swallowed by the mirror)
#[derive(Error, Debug)]
pub enum SharedCacheError {
    #[error("Shared cache unavailable: {message}")]
    Unavailable { message: String },

    #[error("Shared cache rejected entry: {message}")]
    Rejected { message: String },
}

/// Priority work queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The job body panicked inside its worker slot
    #[error("Job '{item}' panicked: {message}")]
    JobPanicked { item: String, message: String },

    /// The worker went away without producing a result
    #[error("Job '{item}' finished without a result")]
    ResultDropped { item: String },
}

impl ProviderError {
    /// Create an authentication failed error
    pub fn auth_failed<S: Into<String>, M: Into<String>>(provider: S, message: M) -> Self {
        Self::AuthenticationFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a transient fetch error
    pub fn fetch<S: Into<String>, M: Into<String>>(provider: S, message: M) -> Self {
        Self::Fetch {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the caller should treat the provider as unusable until
    /// credentials are fixed.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

impl RepositoryError {
    pub fn invalid_value<T: Into<String>, F: Into<String>, V: ToString>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::InvalidValue {
            table: table.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}
