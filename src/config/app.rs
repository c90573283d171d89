//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::probe::ProbeConfig;
use super::report::ReportConfig;
use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default delay between probing cycles (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Minimum delay between probing cycles (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// File touched under the archive root to prove it is writable.
const WRITE_PROBE_FILE: &str = ".pathwatch-write-test";

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
///
/// Built once at startup and handed to the daemon; nothing re-reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delay between probing cycles (default: 60s, minimum: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Archive root holding `{year}/{week}/{weekday}` directories.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Destinations and probe limits.
    pub probe: ProbeConfig,

    /// Report settings; absent disables reports.
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

impl AppConfig {
    /// Create a configuration with defaults for everything but the probe section.
    pub fn new(probe: ProbeConfig) -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            data_dir: default_data_dir(),
            probe,
            report: None,
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < MIN_INTERVAL {
            return Err(ConfigError::invalid(format!(
                "interval must be at least {}s, got {:?}",
                MIN_INTERVAL.as_secs(),
                self.interval
            )));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("data_dir cannot be empty"));
        }

        self.probe.validate()?;

        if let Some(report) = &self.report {
            report.validate()?;
        }

        Ok(())
    }

    /// Create the archive root if needed and verify it accepts writes.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` naming the directory when it
    /// cannot be created or written.
    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        let dir = &self.data_dir;
        let unwritable = |e: std::io::Error| {
            ConfigError::invalid(format!(
                "data_dir '{}' is not writable: {}",
                dir.display(),
                e
            ))
        };

        std::fs::create_dir_all(dir).map_err(unwritable)?;
        let probe = dir.join(WRITE_PROBE_FILE);
        std::fs::write(&probe, b"ok").map_err(unwritable)?;
        std::fs::remove_file(&probe).map_err(unwritable)?;
        Ok(())
    }

    /// Whether any report cadence is configured.
    pub fn reports_enabled(&self) -> bool {
        self.report
            .as_ref()
            .is_some_and(|report| !report.schedules().is_empty())
    }
}
