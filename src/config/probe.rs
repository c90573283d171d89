//! Probe configuration.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::Thresholds;
use crate::probe::ProbeLimits;

use super::validation::ConfigError;

/// Default maximum TTL walked per destination.
pub const DEFAULT_MAX_HOPS: u8 = 30;

/// Default per-hop timeout (10 seconds).
pub const DEFAULT_HOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default latency at which a hop counts as slow (3 seconds).
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(3);

/// Default cap on destinations probed in parallel.
pub const DEFAULT_MAX_WORKERS: usize = 16;

fn default_max_hops() -> u8 {
    DEFAULT_MAX_HOPS
}

fn default_hop_timeout() -> Duration {
    DEFAULT_HOP_TIMEOUT
}

fn default_slow_threshold() -> Duration {
    DEFAULT_SLOW_THRESHOLD
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_resolve_names() -> bool {
    true
}

/// Destinations and limits for one probing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hosts to trace (hostname or IP address).
    pub destinations: Vec<String>,

    /// Highest TTL tried before giving up on a destination (default: 30).
    #[serde(default = "default_max_hops")]
    pub max_hops: u8,

    /// Time to wait for each hop reply (default: 10s).
    #[serde(default = "default_hop_timeout", with = "humantime_serde")]
    pub hop_timeout: Duration,

    /// Latency at which a hop counts as slow (default: 3s).
    #[serde(default = "default_slow_threshold", with = "humantime_serde")]
    pub slow_threshold: Duration,

    /// Maximum destinations probed concurrently (default: 16).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Attempt reverse DNS for every responding hop (default: true).
    #[serde(default = "default_resolve_names")]
    pub resolve_names: bool,
}

impl ProbeConfig {
    /// Create a probe configuration with default limits.
    pub fn new<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destinations: destinations.into_iter().map(Into::into).collect(),
            max_hops: DEFAULT_MAX_HOPS,
            hop_timeout: DEFAULT_HOP_TIMEOUT,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            max_workers: DEFAULT_MAX_WORKERS,
            resolve_names: true,
        }
    }

    /// Set the per-hop timeout.
    pub fn with_hop_timeout(mut self, timeout: Duration) -> Self {
        self.hop_timeout = timeout;
        self
    }

    /// Set the slow-hop threshold.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Set the maximum TTL.
    pub fn with_max_hops(mut self, max_hops: u8) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Set the worker cap.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Limits handed to the prober for every destination.
    pub fn limits(&self) -> ProbeLimits {
        ProbeLimits::new(self.max_hops, self.hop_timeout)
    }

    /// Thresholds handed to the classifier.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.slow_threshold, self.hop_timeout)
    }

    /// Validate destinations and limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destinations.is_empty() {
            return Err(ConfigError::invalid(
                "at least one probe destination is required",
            ));
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            if destination.trim().is_empty() {
                return Err(ConfigError::invalid("probe destination cannot be empty"));
            }
            if !seen.insert(destination.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate probe destination: '{}'",
                    destination
                )));
            }
        }

        if self.max_hops == 0 {
            return Err(ConfigError::invalid("probe max_hops must be at least 1"));
        }
        if self.hop_timeout.is_zero() {
            return Err(ConfigError::invalid("probe hop_timeout must be positive"));
        }
        if self.slow_threshold.is_zero() {
            return Err(ConfigError::invalid("probe slow_threshold must be positive"));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("probe max_workers must be at least 1"));
        }
        if self.slow_threshold > self.hop_timeout {
            tracing::warn!(
                slow_threshold = ?self.slow_threshold,
                hop_timeout = ?self.hop_timeout,
                "Slow threshold exceeds hop timeout; timed-out hops may not count as slow"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_config_defaults() {
        let config = ProbeConfig::new(["8.8.8.8"]);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.hop_timeout, Duration::from_millis(10_000));
        assert_eq!(config.slow_threshold, Duration::from_millis(3_000));
        assert!(config.resolve_names);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_probe_config_yaml_defaults() {
        let config: ProbeConfig = serde_yaml::from_str("destinations: [a.test, b.test]").unwrap();
        assert_eq!(config.destinations, vec!["a.test", "b.test"]);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.hop_timeout, DEFAULT_HOP_TIMEOUT);
    }

    #[test]
    fn test_probe_config_rejects_empty_destinations() {
        let config = ProbeConfig::new(Vec::<String>::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one probe destination"));
    }

    #[test]
    fn test_probe_config_rejects_duplicates() {
        let config = ProbeConfig::new(["a.test", "a.test"]);
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("duplicate probe destination")
        );
    }

    #[test]
    fn test_probe_config_rejects_zero_limits() {
        assert!(ProbeConfig::new(["a.test"]).with_max_hops(0).validate().is_err());
        assert!(
            ProbeConfig::new(["a.test"])
                .with_hop_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(ProbeConfig::new(["a.test"]).with_max_workers(0).validate().is_err());
    }

    #[test]
    fn test_probe_config_limits_and_thresholds() {
        let config = ProbeConfig::new(["a.test"])
            .with_max_hops(12)
            .with_hop_timeout(Duration::from_secs(4))
            .with_slow_threshold(Duration::from_secs(2));

        let limits = config.limits();
        assert_eq!(limits.max_hops, 12);
        assert_eq!(limits.timeout_per_hop, Duration::from_secs(4));

        let thresholds = config.thresholds();
        assert_eq!(thresholds.slow_ms, 2_000);
        assert_eq!(thresholds.timeout_ms, 4_000);
    }
}
