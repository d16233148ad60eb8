//! Jitter for retry backoff

use rand::Rng;
use std::time::Duration;

/// Random jitter between 0 and `max_jitter_ms` (inclusive)
pub fn generate_jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }
    rand::rng().random_range(0..=max_jitter_ms)
}

/// Random jitter of up to `jitter_percent` percent of `base_value`
pub fn generate_jitter_percent(base_value: u64, jitter_percent: u8) -> u64 {
    if jitter_percent == 0 || base_value == 0 {
        return 0;
    }

    let max_jitter = base_value.saturating_mul(jitter_percent as u64) / 100;
    generate_jitter_ms(max_jitter)
}

/// Exponential backoff for the given attempt (1-based) with up to 25% jitter
pub fn backoff_with_jitter(base: Duration, attempt: u32) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let exp = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    Duration::from_millis(exp.saturating_add(generate_jitter_percent(exp, 25)))
}
