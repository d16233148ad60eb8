use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Quality, ShowId};

/// Season value meaning "no season"; rows carrying it never match
pub const NO_SEASON: i32 = -1;

/// One persisted, deduplicated provider listing
///
/// Unique per `(provider, url)`. Rows are never updated; they disappear only
/// when the provider's cache is cleared as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub provider: String,
    pub name: String,
    pub season: i32,
    /// Episode numbers within `season`, never empty for a stored row
    pub episodes: Vec<u32>,
    pub show_id: ShowId,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub quality: Quality,
    pub release_group: String,
    pub version: i32,
    pub seeders: i64,
    pub leechers: i64,
    pub size: i64,
}

impl CacheEntry {
    pub fn contains_episode(&self, episode: u32) -> bool {
        self.episodes.contains(&episode)
    }
}

/// Encode episode numbers the way they are stored: `|1|2|`
pub fn encode_episodes(episodes: &[u32]) -> String {
    let mut encoded = String::from("|");
    for episode in episodes {
        encoded.push_str(&episode.to_string());
        encoded.push('|');
    }
    encoded
}

/// Decode a stored episode list, `None` if any segment is not a number
pub fn decode_episodes(encoded: &str) -> Option<Vec<u32>> {
    encoded
        .split('|')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.parse().ok())
        .collect()
}

/// Pattern a stored episode list must contain to include `episode`
pub fn episode_pattern(episode: u32) -> String {
    format!("|{episode}|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_encoding() {
        assert_eq!(encode_episodes(&[1, 2, 10]), "|1|2|10|");
        assert_eq!(decode_episodes("|1|2|10|"), Some(vec![1, 2, 10]));
        assert_eq!(decode_episodes("|1|x|"), None);
        assert_eq!(decode_episodes("||"), Some(vec![]));
    }

    #[test]
    fn test_episode_pattern_does_not_match_prefixes() {
        let stored = encode_episodes(&[10, 11]);
        assert!(!stored.contains(&episode_pattern(1)));
        assert!(stored.contains(&episode_pattern(11)));
    }
}
