//! Utility modules shared by the cache and the mirror

pub mod jitter;
pub mod url;

pub use url::UrlUtils;
