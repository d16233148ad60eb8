//! Provider capability trait definitions

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::ProviderResult;

/// Search strings handed to a provider, keyed by search mode (e.g. `RSS`)
pub type SearchCriteria = BTreeMap<String, Vec<String>>;

/// One raw listing as returned by a provider.
///
/// The shape is provider specific; the provider's own `title_and_url`,
/// `result_stats` and `size` extractors know how to read it.
pub type FeedItem = Value;

/// External listing provider
///
/// Only `id`, `name` and `search` are required. The extractors default to
/// the common `title`/`link`/`seeders`/`leechers`/`size` field names.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used as the cache partition key
    fn id(&self) -> &str;

    /// Human readable name for logging
    fn name(&self) -> &str;

    /// Provider only indexes anime releases
    fn is_anime_only(&self) -> bool {
        false
    }

    /// Private trackers never take part in the shared cache
    fn is_private(&self) -> bool {
        false
    }

    /// Establish a session. `Ok(false)` means the credentials were refused.
    async fn login(&self) -> ProviderResult<bool> {
        Ok(true)
    }

    /// Fetch raw listings for the given search criteria
    async fn search(&self, criteria: &SearchCriteria) -> ProviderResult<Vec<FeedItem>>;

    /// Extract release title and download url from a raw item
    fn title_and_url(&self, item: &FeedItem) -> (Option<String>, Option<String>) {
        let title = item.get("title").and_then(Value::as_str).map(str::to_string);
        let url = item.get("link").and_then(Value::as_str).map(str::to_string);
        (title, url)
    }

    /// Extract `(seeders, leechers)`, `-1` when unknown
    fn result_stats(&self, item: &FeedItem) -> (i64, i64) {
        (int_field(item, "seeders"), int_field(item, "leechers"))
    }

    /// Extract the release size in bytes, `-1` when unknown
    fn size(&self, item: &FeedItem) -> i64 {
        int_field(item, "size")
    }
}

/// Read an integer field that may be encoded as a number or numeric string
pub fn int_field(item: &FeedItem, key: &str) -> i64 {
    match item.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Plain;

    #[async_trait]
    impl Provider for Plain {
        fn id(&self) -> &str {
            "plain"
        }

        fn name(&self) -> &str {
            "Plain"
        }

        async fn search(&self, _criteria: &SearchCriteria) -> ProviderResult<Vec<FeedItem>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_extractors() {
        let item = json!({
            "title": "Show.S01E01.720p",
            "link": "https://example.com/a.torrent",
            "seeders": 12,
            "leechers": "3",
            "size": "not a number",
        });

        let provider = Plain;
        assert_eq!(
            provider.title_and_url(&item),
            (
                Some("Show.S01E01.720p".to_string()),
                Some("https://example.com/a.torrent".to_string())
            )
        );
        assert_eq!(provider.result_stats(&item), (12, 3));
        assert_eq!(provider.size(&item), -1);
        assert!(!provider.is_private());
        assert!(!provider.is_anime_only());
    }

    #[test]
    fn test_missing_fields() {
        let provider = Plain;
        let item = json!({});
        assert_eq!(provider.title_and_url(&item), (None, None));
        assert_eq!(provider.result_stats(&item), (-1, -1));
    }
}
