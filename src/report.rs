//! Periodic network reports.
//!
//! - [`cadence`]: daily and weekly send windows
//! - [`compose`]: aggregation of archive rows into an HTML report
//! - [`scheduler`]: the once-per-period dispatch state machine

pub mod cadence;
pub mod compose;
pub mod scheduler;

pub use cadence::{CadenceSchedule, DispatchState, ReportCadence};
pub use compose::{DestinationTotals, Report, ReportSummary, compose, subject};
pub use scheduler::{DispatchOutcome, Scheduler};
