use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-provider refresh bookkeeping
///
/// Absent or future timestamps read as the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshState {
    pub last_update: DateTime<Utc>,
    pub last_search: DateTime<Utc>,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self {
            last_update: DateTime::<Utc>::UNIX_EPOCH,
            last_search: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl RefreshState {
    /// The previous batch has been consumed by at least one search pass
    pub fn results_consumed(&self) -> bool {
        self.last_search >= self.last_update
    }
}

/// Outcome of a feed refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The minimum interval has not elapsed yet and no force was requested
    NotDue,
    /// The feed was fetched and processed
    Refreshed {
        cleared: bool,
        fetched: usize,
        added: usize,
    },
    /// The provider rejected our credentials
    AuthFailed { message: String },
    /// Any other failure; the refresh is skipped until the next pass
    Failed { message: String },
}

impl RefreshOutcome {
    /// `false` only for the two failure variants
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::AuthFailed { .. } | Self::Failed { .. })
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }
}
