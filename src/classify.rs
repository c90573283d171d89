//! Reduction of hop observations into a per-destination summary.
//!
//! Pure functions only: [`classify`] performs no I/O and yields identical
//! summaries for identical inputs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::{HopObservation, HopStatus};

/// A path is mostly slow once slow hops reach `total_hops / SLOW_DIVISOR`.
const SLOW_DIVISOR: usize = 4;

/// Timed-out hops at which a path is degraded.
const TIMEOUT_LIMIT: usize = 2;

/// Paths with this many hops or fewer are never failed on timeouts.
const SHORT_PATH_HOPS: usize = 2;

/// Latency thresholds used to count slow and timed-out hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Latency (ms) at or above which a hop is slow.
    pub slow_ms: u64,
    /// Latency (ms) at or above which a hop counts as a timeout.
    pub timeout_ms: u64,
}

impl Thresholds {
    /// Build thresholds from durations.
    pub fn new(slow: Duration, timeout: Duration) -> Self {
        Self::from_millis(duration_ms(slow), duration_ms(timeout))
    }

    /// Build thresholds from milliseconds.
    pub fn from_millis(slow_ms: u64, timeout_ms: u64) -> Self {
        Self {
            slow_ms,
            timeout_ms,
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// One destination's reduction for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Destination as configured.
    pub destination: String,
    /// Number of hop observations.
    pub total_hops: usize,
    /// Hops that timed out or exceeded the timeout threshold.
    pub timeouts: usize,
    /// Hops at or above the slow threshold.
    pub slow_hops: usize,
    /// Per-hop latencies in milliseconds, in hop order.
    pub latencies_ms: Vec<u64>,
    /// Destination-level verdict.
    pub success: bool,
}

impl TraceSummary {
    /// Whether the destination was judged degraded.
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

/// Whether a single hop counts as a timeout.
pub fn is_timeout(hop: &HopObservation, thresholds: &Thresholds) -> bool {
    hop.status == HopStatus::TimedOut || hop.latency_ms() >= thresholds.timeout_ms
}

/// Destination-level verdict.
///
/// A path fails only when slow hops reach a quarter of all hops (integer
/// division, so 9 hops need 2 slow ones) *and* at least two hops timed out on
/// a path longer than two hops. Either condition alone is tolerated.
pub fn verdict(total_hops: usize, timeouts: usize, slow_hops: usize) -> bool {
    let mostly_slow = slow_hops >= total_hops / SLOW_DIVISOR;
    let repeated_timeouts = timeouts >= TIMEOUT_LIMIT && total_hops > SHORT_PATH_HOPS;
    !(mostly_slow && repeated_timeouts)
}

/// Reduce a trace to its summary.
pub fn classify(
    destination: &str,
    hops: &[HopObservation],
    thresholds: &Thresholds,
) -> TraceSummary {
    let total_hops = hops.len();
    let timeouts = hops.iter().filter(|h| is_timeout(h, thresholds)).count();
    let slow_hops = hops.iter().filter(|h| h.is_slow(thresholds.slow_ms)).count();
    let latencies_ms = hops.iter().map(HopObservation::latency_ms).collect();

    TraceSummary {
        destination: destination.to_string(),
        total_hops,
        timeouts,
        slow_hops,
        latencies_ms,
        success: verdict(total_hops, timeouts, slow_hops),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(n: u8, latency_ms: u64, status: HopStatus) -> HopObservation {
        HopObservation::new(n, None, Duration::from_millis(latency_ms), status)
    }

    #[test]
    fn test_classify_counts_boundary_timeouts() {
        let hops = vec![
            hop(1, 100, HopStatus::TtlExpired),
            hop(2, 5000, HopStatus::TimedOut),
            hop(3, 4000, HopStatus::Success),
        ];
        let summary = classify("a.test", &hops, &Thresholds::from_millis(3000, 4000));

        assert_eq!(summary.total_hops, 3);
        assert_eq!(summary.timeouts, 2);
        assert_eq!(summary.slow_hops, 2);
        assert_eq!(summary.latencies_ms, vec![100, 5000, 4000]);
        assert!(!summary.success);
    }

    #[test]
    fn test_classify_timed_out_status_counts_regardless_of_latency() {
        let hops = vec![hop(1, 10, HopStatus::TimedOut)];
        let summary = classify("a.test", &hops, &Thresholds::from_millis(3000, 4000));
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.slow_hops, 0);
    }

    #[test]
    fn test_classify_is_pure() {
        let hops = vec![
            hop(1, 12, HopStatus::TtlExpired),
            hop(2, 3500, HopStatus::TtlExpired),
            hop(3, 40, HopStatus::Success),
        ];
        let thresholds = Thresholds::from_millis(3000, 10_000);
        assert_eq!(
            classify("b.test", &hops, &thresholds),
            classify("b.test", &hops, &thresholds)
        );
    }

    #[test]
    fn test_classify_healthy_path() {
        let hops = vec![
            hop(1, 1, HopStatus::TtlExpired),
            hop(2, 8, HopStatus::TtlExpired),
            hop(3, 20, HopStatus::Success),
        ];
        let summary = classify("b.test", &hops, &Thresholds::from_millis(3000, 10_000));
        assert_eq!(summary.timeouts, 0);
        assert_eq!(summary.slow_hops, 0);
        assert!(summary.success);
    }

    #[test]
    fn test_verdict_requires_both_conditions() {
        // Mostly slow, but only one timeout.
        assert!(verdict(8, 1, 8));
        // Many timeouts, but fewer than a quarter slow.
        assert!(verdict(20, 4, 4));
        // Both degraded.
        assert!(!verdict(8, 2, 2));
    }

    #[test]
    fn test_verdict_short_paths_never_fail() {
        assert!(verdict(2, 2, 2));
        assert!(verdict(1, 1, 1));
    }

    #[test]
    fn test_verdict_quarter_boundary() {
        // 2 of 8 is exactly a quarter.
        assert!(!verdict(8, 2, 2));
        // 1 of 8 is below a quarter.
        assert!(verdict(8, 2, 1));
        // The quarter rounds down: 9 / 4 == 2.
        assert!(!verdict(9, 2, 2));
        assert!(verdict(9, 2, 1));
        // Below four hops any slow count reaches the quarter.
        assert!(!verdict(3, 2, 0));
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_micros(2_999)), 2);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_thresholds_from_durations() {
        let t = Thresholds::new(Duration::from_secs(3), Duration::from_secs(10));
        assert_eq!(t, Thresholds::from_millis(3000, 10_000));
    }
}
