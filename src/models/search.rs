use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{EpisodeId, Quality, ShowId};

/// A cached listing that survived matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub provider: String,
    pub show_id: ShowId,
    pub episode_ids: Vec<EpisodeId>,
    pub quality: Quality,
    pub release_group: String,
    pub version: i32,
    pub name: String,
    pub url: String,
    pub seeders: i64,
    pub leechers: i64,
    pub size: i64,
}

/// Matched results grouped by episode, in candidate scan order
pub type SearchResults = BTreeMap<EpisodeId, Vec<SearchResult>>;
