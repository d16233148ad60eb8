//! Centralized error handling for the provider cache
//!
//! Errors are grouped by the layer that raises them. Most of them never leave
//! the cache: a rejected feed item or an unresolvable episode simply skips one
//! unit of work. The types still exist so that every skip is logged with a
//! reason and so tests can assert on the exact failure.
//!
//! # Error Categories
//!
//! - **Repository Errors**: SeaORM operations and migrations
//! - **Provider Errors**: authentication and transient fetch failures
//! - **Name Parse Errors**: release names that cannot be used
//! - **Registry Errors**: shows or episodes the registry cannot resolve
//! - **Shared Cache Errors**: best-effort mirror failures
//! - **Queue Errors**: job-body panics and lost results
//!
//! # Usage
//!
//! ```rust
//! use tv_cache::errors::{AppError, AppResult};
//!
//! async fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Provider Results
pub type ProviderResult<T> = Result<T, ProviderError>;
