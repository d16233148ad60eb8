//! Provider abstractions
//!
//! A provider is an external source of episode listings (indexer, tracker or
//! usenet feed). The cache only ever talks to providers through the
//! [`Provider`] trait; transport, authentication and payload formats are the
//! implementation's concern.

pub mod traits;

pub use traits::*;
