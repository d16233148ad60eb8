//! SeaORM repository implementations
//!
//! Each public method is one unit of work: it either runs a single statement
//! or opens its own transaction and commits before returning.

pub mod provider_cache;
pub mod refresh_state;

pub use provider_cache::ProviderCacheSeaOrmRepository;
pub use refresh_state::RefreshStateSeaOrmRepository;

use chrono::{DateTime, Utc};

/// Convert stored unix seconds into a timestamp.
///
/// Missing, unrepresentable and future values all read as the epoch, which
/// keeps a skewed clock from suppressing refreshes forever.
pub(crate) fn stored_time(value: Option<i64>, now: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .filter(|at| *at <= now)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stored_time_clamps_future_values() {
        let now = Utc::now();
        let past = now - Duration::minutes(5);

        assert_eq!(stored_time(None, now), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(stored_time(Some(past.timestamp()), now).timestamp(), past.timestamp());
        assert_eq!(
            stored_time(Some((now + Duration::hours(1)).timestamp()), now),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }
}
