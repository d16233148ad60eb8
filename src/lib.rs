//! Provider listing cache with want-policy matching and a priority work queue
//!
//! Listings fetched from a [`sources::Provider`] are validated, deduplicated
//! and stored per provider by [`services::TvCache`], which also answers
//! "which cached releases do I still want" searches. Refreshes and searches
//! are driven by [`job_scheduling::PriorityWorkQueue`].

pub mod config;
pub mod context;
pub mod database;
pub mod entities;
pub mod errors;
pub mod job_scheduling;
pub mod models;
pub mod observability;
pub mod services;
pub mod sources;
pub mod utils;

pub use context::CacheContext;
pub use errors::{AppError, AppResult};
