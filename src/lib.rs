//! Pathwatch - network path monitor
//!
//! This crate traces the route to a set of destinations on a fixed
//! interval, judges each path healthy or degraded, archives the results
//! as weekly/daily CSV records and sends daily and weekly summary reports.
//! It can be used as a library, or run as a daemon with the `pathwatch`
//! executable.
//!
//! # Architecture
//!
//! - **Probe**: TTL-walking ICMP tracer producing hop observations
//! - **Classify**: Pure reduction of hops into a per-destination verdict
//! - **Orchestrator**: Bounded concurrent fan-out over destinations
//! - **Archive**: `{year}/{week}/{weekday}` CSV records and dispatch markers
//! - **Report**: Once-per-period report scheduling and composition
//! - **Notify**: SMTP and webhook delivery
//! - **Daemon**: The cancellable driver loop
//!
//! # Example
//!
//! ```rust,no_run
//! use pathwatch::{AppConfig, Daemon};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("configs/pathwatch.yaml")?;
//!     config.ensure_data_dir()?;
//!
//!     let daemon = Daemon::from_config(&config)?;
//!     daemon.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod classify;
pub mod config;
pub mod daemon;
pub mod notify;
pub mod orchestrator;
pub mod probe;
pub mod report;

pub use archive::{Archive, ArchiveError, ArchiveLocation, ArchiveRow, PeriodKey};
pub use classify::{Thresholds, TraceSummary, classify};
pub use config::{AppConfig, ConfigError, ProbeConfig, ReportConfig, TransportConfig};
pub use daemon::{CycleReport, Daemon};
pub use notify::{Notifier, SendError, SmtpNotifier, WebhookNotifier};
pub use orchestrator::Orchestrator;
pub use probe::{
    EchoProbe, HopObservation, HopStatus, IcmpEcho, ProbeError, ProbeLimits, Prober, Tracer,
};
pub use report::{CadenceSchedule, DispatchState, ReportCadence, Scheduler};
