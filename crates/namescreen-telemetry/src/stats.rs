//! Detection counters
//!
//! Kept as atomics for the `/stats` snapshot and mirrored into the `metrics`
//! facade so a Prometheus recorder (when installed) sees the same numbers.

use metrics::{counter, histogram};
use namescreen_core::Tier;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared detection statistics
#[derive(Clone, Default)]
pub struct DetectionStats {
    inner: Arc<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    total_requests: AtomicU64,
    tier1_handled: AtomicU64,
    tier2_handled: AtomicU64,
    tier3_handled: AtomicU64,
    cache_hits: AtomicU64,
    sanctions_matches: AtomicU64,
    fallback_failures: AtomicU64,
    total_latency_us: AtomicU64,
}

impl DetectionStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one incoming request
    pub fn record_request(&self) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        counter!("namescreen_requests_total").increment(1);
    }

    /// Count a request answered from the cache
    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("namescreen_cache_hits_total").increment(1);
    }

    /// Count a freshly finalized request against the tier that decided it
    pub fn record_finalized(&self, tier: Tier, sanctions_found: bool) {
        let bucket = match tier {
            Tier::QuickFilter => &self.inner.tier1_handled,
            Tier::FastNer | Tier::AccurateNer => &self.inner.tier2_handled,
            Tier::Llm => &self.inner.tier3_handled,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        counter!("namescreen_detections_total", "tier" => tier.as_str()).increment(1);

        if sanctions_found {
            self.inner.sanctions_matches.fetch_add(1, Ordering::Relaxed);
            counter!("namescreen_sanctions_matches_total").increment(1);
        }
    }

    /// Count a fallback attempt that produced nothing (timeout, rejection, error)
    pub fn record_fallback_failure(&self, reason: &'static str) {
        self.inner.fallback_failures.fetch_add(1, Ordering::Relaxed);
        counter!("namescreen_fallback_failures_total", "reason" => reason).increment(1);
    }

    /// Record end-to-end latency of one request
    pub fn record_latency(&self, latency_us: u64) {
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
        histogram!("namescreen_detect_latency_seconds").record(latency_us as f64 / 1_000_000.0);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            tier1_handled: self.inner.tier1_handled.load(Ordering::Relaxed),
            tier2_handled: self.inner.tier2_handled.load(Ordering::Relaxed),
            tier3_handled: self.inner.tier3_handled.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            sanctions_matches: self.inner.sanctions_matches.load(Ordering::Relaxed),
            fallback_failures: self.inner.fallback_failures.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub tier1_handled: u64,
    pub tier2_handled: u64,
    pub tier3_handled: u64,
    pub cache_hits: u64,
    pub sanctions_matches: u64,
    pub fallback_failures: u64,
    pub total_latency_us: u64,
}

/// Share of requests handled by each tier, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierShares {
    pub tier1: f64,
    pub tier2: f64,
    pub tier3: f64,
    pub cache: f64,
}

impl StatsSnapshot {
    /// Calculate average latency per request
    pub fn avg_latency_us(&self) -> u64 {
        if self.total_requests == 0 {
            0
        } else {
            self.total_latency_us / self.total_requests
        }
    }

    /// Percentage breakdown by tier
    pub fn shares(&self) -> TierShares {
        let pct = |count: u64| {
            if self.total_requests == 0 {
                0.0
            } else {
                count as f64 / self.total_requests as f64 * 100.0
            }
        };

        TierShares {
            tier1: pct(self.tier1_handled),
            tier2: pct(self.tier2_handled),
            tier3: pct(self.tier3_handled),
            cache: pct(self.cache_hits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_collection() {
        let stats = DetectionStats::new();

        stats.record_request();
        stats.record_finalized(Tier::QuickFilter, false);
        stats.record_request();
        stats.record_finalized(Tier::AccurateNer, true);
        stats.record_request();
        stats.record_cache_hit();
        stats.record_request();
        stats.record_finalized(Tier::Llm, false);
        stats.record_latency(4000);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.tier1_handled, 1);
        assert_eq!(snapshot.tier2_handled, 1);
        assert_eq!(snapshot.tier3_handled, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.sanctions_matches, 1);
        assert_eq!(snapshot.avg_latency_us(), 1000);

        let shares = snapshot.shares();
        assert_eq!(shares.tier1, 25.0);
        assert_eq!(shares.cache, 25.0);
    }

    #[test]
    fn test_empty_shares() {
        let shares = StatsSnapshot::default().shares();
        assert_eq!(shares.tier2, 0.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = DetectionStats::new();
        let other = stats.clone();
        other.record_fallback_failure("timeout");
        assert_eq!(stats.snapshot().fallback_failures, 1);
    }
}
