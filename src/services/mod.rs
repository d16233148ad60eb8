//! Cache services
//!
//! - [`TvCache`]: per-provider entry store, feed refresh and match engine
//! - [`SharedCacheMirror`]: background writer for the shared external cache
//! - [`traits`]: the collaborator interfaces both of them consume

pub mod mirror;
pub mod traits;
pub mod tv_cache;

pub use mirror::{MirrorStats, MirrorStatsSnapshot, SharedCacheMirror};
pub use traits::{Episode, NameParser, ParseResult, ReleaseFilter, SharedCache, Show, ShowRegistry};
pub use tv_cache::TvCache;
