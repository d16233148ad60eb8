//! Domain models for the provider cache

pub mod cache_entry;
pub mod quality;
pub mod refresh_state;
pub mod search;

pub use cache_entry::*;
pub use quality::Quality;
pub use refresh_state::*;
pub use search::*;

/// Registry identifier of a show
pub type ShowId = u64;

/// Registry identifier of a single episode
pub type EpisodeId = u64;
