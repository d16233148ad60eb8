//! OpenTelemetry instruments for ingestion, matching and mirroring
//!
//! Instruments are created from the global meter provider. With no provider
//! installed they are no-ops, so library users opt in by installing their
//! own exporter.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};

/// Pre-built cache instruments
#[derive(Clone)]
pub struct CacheMetrics {
    pub meter: Meter,

    pub refresh_total: Counter<u64>,
    pub refresh_failures: Counter<u64>,
    pub refresh_duration: Histogram<f64>,
    pub entries_added: Counter<u64>,
    pub entries_rejected: Counter<u64>,
    pub entries_cleared: Counter<u64>,

    pub searches_total: Counter<u64>,
    pub candidates_rejected: Counter<u64>,
    pub results_found: Counter<u64>,

    pub mirror_writes: Counter<u64>,
    pub mirror_failures: Counter<u64>,
    pub mirror_dropped: Counter<u64>,
}

impl CacheMetrics {
    /// Instruments backed by the globally installed meter provider
    pub fn new() -> Self {
        Self::build_with_instruments(global::meter("tv-cache"))
    }

    fn build_with_instruments(meter: Meter) -> Self {
        // Feed refresh
        let refresh_total = meter
            .u64_counter("cache_refresh_total")
            .with_description("Feed refresh attempts that reached the provider")
            .build();
        let refresh_failures = meter
            .u64_counter("cache_refresh_failures_total")
            .with_description("Feed refreshes aborted by auth or fetch failures")
            .build();
        let refresh_duration = meter
            .f64_histogram("cache_refresh_duration_seconds")
            .with_description("Time taken to fetch and ingest a provider feed")
            .build();
        let entries_added = meter
            .u64_counter("cache_entries_added_total")
            .with_description("Listings persisted to the cache")
            .build();
        let entries_rejected = meter
            .u64_counter("cache_entries_rejected_total")
            .with_description("Listings rejected during ingestion")
            .build();
        let entries_cleared = meter
            .u64_counter("cache_entries_cleared_total")
            .with_description("Listings removed by provider cache clears")
            .build();

        // Matching
        let searches_total = meter
            .u64_counter("cache_searches_total")
            .with_description("Search passes over the cache")
            .build();
        let candidates_rejected = meter
            .u64_counter("cache_candidates_rejected_total")
            .with_description("Candidates discarded during matching")
            .build();
        let results_found = meter
            .u64_counter("cache_results_found_total")
            .with_description("Candidates returned as search results")
            .build();

        // Shared cache mirror
        let mirror_writes = meter
            .u64_counter("shared_cache_writes_total")
            .with_description("Entries written to the shared cache")
            .build();
        let mirror_failures = meter
            .u64_counter("shared_cache_failures_total")
            .with_description("Shared cache reads or writes that failed")
            .build();
        let mirror_dropped = meter
            .u64_counter("shared_cache_dropped_total")
            .with_description("Mirror writes dropped because the queue was full")
            .build();

        Self {
            meter,
            refresh_total,
            refresh_failures,
            refresh_duration,
            entries_added,
            entries_rejected,
            entries_cleared,
            searches_total,
            candidates_rejected,
            results_found,
            mirror_writes,
            mirror_failures,
            mirror_dropped,
        }
    }

    pub fn provider_attrs(provider: &str) -> [KeyValue; 1] {
        [KeyValue::new("provider", provider.to_string())]
    }

    pub fn reason_attrs(provider: &str, reason: &'static str) -> [KeyValue; 2] {
        [
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("reason", reason),
        ]
    }
}

impl std::fmt::Debug for CacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMetrics").finish_non_exhaustive()
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}
