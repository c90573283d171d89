//! Per-cadence dispatch state machine.
//!
//! Each (period, cadence) pair moves `NotDue -> Due -> Sent`. The `Sent`
//! state is the dispatch marker on disk, so it survives restarts and is
//! left behind once the period rolls over.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};

use super::cadence::{CadenceSchedule, DispatchState, ReportCadence};
use super::compose::{ReportSummary, compose, subject};
use crate::archive::{self, Archive};
use crate::config::ReportConfig;
use crate::notify::Notifier;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub cadence: ReportCadence,
    pub subject: String,
    /// Whether the notifier accepted the report.
    pub delivered: bool,
    /// Whether the dispatch marker was written.
    pub marked: bool,
}

/// Decides when reports are due and dispatches them.
#[derive(Clone)]
pub struct Scheduler {
    archive: Archive,
    schedules: Vec<CadenceSchedule>,
    recipient: String,
    mark_failed_sends: bool,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("schedules", &self.schedules)
            .field("recipient", &self.recipient)
            .field("mark_failed_sends", &self.mark_failed_sends)
            .field("notifier", &self.notifier.name())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Scheduler without cadences; add them with [`Scheduler::with_schedule`].
    pub fn new(archive: Archive, recipient: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            archive,
            schedules: Vec::new(),
            recipient: recipient.into(),
            mark_failed_sends: true,
            notifier,
        }
    }

    /// Scheduler for the cadences of a report configuration.
    pub fn from_config(archive: Archive, config: &ReportConfig, notifier: Arc<dyn Notifier>) -> Self {
        let mut scheduler = Self::new(archive, config.recipient.clone(), notifier)
            .with_mark_failed_sends(config.mark_failed_sends);
        scheduler.schedules = config.schedules();
        scheduler
    }

    pub fn with_schedule(mut self, schedule: CadenceSchedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    /// Write the marker after failed sends too (default: true).
    pub fn with_mark_failed_sends(mut self, enabled: bool) -> Self {
        self.mark_failed_sends = enabled;
        self
    }

    pub fn schedules(&self) -> &[CadenceSchedule] {
        &self.schedules
    }

    /// State of `schedule` in the period containing `now`.
    pub fn state<Tz: TimeZone>(&self, schedule: &CadenceSchedule, now: &DateTime<Tz>) -> DispatchState {
        let location = self.archive.locate(now);
        if self.archive.has_marker(&location, schedule.cadence) {
            DispatchState::Sent
        } else if schedule.window_open(now) {
            DispatchState::Due
        } else {
            DispatchState::NotDue
        }
    }

    /// Dispatch every report that is due at `now`.
    ///
    /// Failures are logged and reflected in the outcomes; nothing here
    /// stops the caller's loop.
    pub async fn dispatch_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<DispatchOutcome>
    where
        Tz::Offset: std::fmt::Display + Send + Sync,
    {
        let mut outcomes = Vec::new();
        for schedule in &self.schedules {
            let state = self.state(schedule, now);
            tracing::debug!(cadence = %schedule.cadence, state = %state, "Report state");
            if state == DispatchState::Due {
                outcomes.push(self.dispatch(schedule.cadence, now).await);
            }
        }
        outcomes
    }

    async fn dispatch<Tz: TimeZone>(&self, cadence: ReportCadence, now: &DateTime<Tz>) -> DispatchOutcome
    where
        Tz::Offset: std::fmt::Display + Send + Sync,
    {
        let location = self.archive.locate(now);
        let records: Vec<PathBuf> = match cadence {
            ReportCadence::Daily => Some(location.record.clone())
                .filter(|path| archive::exists(path))
                .into_iter()
                .collect(),
            ReportCadence::Weekly => self.archive.week_records(location.key),
        };
        let summary = ReportSummary::from_records(&records);
        let report = match compose(cadence, now, &summary) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(cadence = %cadence, error = %e, "Failed to render report");
                return DispatchOutcome {
                    cadence,
                    subject: subject(cadence, now),
                    delivered: false,
                    marked: false,
                };
            }
        };

        let result = self
            .notifier
            .send(&self.recipient, &report.subject, &report.body, true)
            .await;

        let status = match &result {
            Ok(()) => {
                tracing::info!(
                    cadence = %cadence,
                    recipient = %self.recipient,
                    transport = self.notifier.name(),
                    subject = %report.subject,
                    "Report sent"
                );
                "sent".to_string()
            }
            Err(e) => {
                tracing::error!(
                    cadence = %cadence,
                    recipient = %self.recipient,
                    transport = self.notifier.name(),
                    error = %e,
                    "Failed to send report"
                );
                format!("failed: {e}")
            }
        };
        let delivered = result.is_ok();

        let marked = if delivered || self.mark_failed_sends {
            let contents = format!("{status}\n{}\n\n{}", report.subject, report.body);
            match self.archive.write_marker(&location, cadence, &contents) {
                Ok(path) => {
                    tracing::debug!(marker = %path.display(), "Dispatch marker written");
                    true
                }
                Err(e) => {
                    tracing::error!(
                        cadence = %cadence,
                        error = %e,
                        "Failed to write dispatch marker; report may be sent again"
                    );
                    false
                }
            }
        } else {
            tracing::warn!(cadence = %cadence, "Report left unmarked; a later cycle will retry");
            false
        };

        DispatchOutcome {
            cadence,
            subject: report.subject,
            delivered,
            marked,
        }
    }
}
