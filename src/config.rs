//! Configuration for the pathwatch daemon.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Cycle interval and archive root
//! - Probe settings (destinations, hop limits, thresholds, worker cap)
//! - Report settings (cadences, recipient, notification transport)

mod app;
mod probe;
mod report;
mod validation;

pub use app::{AppConfig, DEFAULT_INTERVAL, MIN_INTERVAL};
pub use probe::{
    DEFAULT_HOP_TIMEOUT, DEFAULT_MAX_HOPS, DEFAULT_MAX_WORKERS, DEFAULT_SLOW_THRESHOLD,
    ProbeConfig,
};
pub use report::{CadenceConfig, ReportConfig, SmtpConfig, TransportConfig, WebhookConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
