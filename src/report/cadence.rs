//! Report cadences and their send windows.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How often a report is sent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportCadence {
    /// One report per day, covering that day.
    Daily,
    /// One report per ISO week, covering the week so far.
    Weekly,
}

impl ReportCadence {
    /// File recording that this cadence's report went out for a period.
    pub fn marker_file_name(&self) -> &'static str {
        match self {
            Self::Daily => "daily-report-sent",
            Self::Weekly => "weekly-report-sent",
        }
    }
}

/// Where a cadence is in its period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchState {
    /// Outside the send window, or the wrong weekday.
    NotDue,
    /// In the send window with no report dispatched yet.
    Due,
    /// A report was already dispatched for this period.
    Sent,
}

/// Send window of one cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceSchedule {
    pub cadence: ReportCadence,
    /// Local hour the current hour must be strictly past.
    pub send_hour: u32,
    /// Target weekday (weekly only).
    pub weekday: Option<Weekday>,
}

impl CadenceSchedule {
    pub fn daily(send_hour: u32) -> Self {
        Self {
            cadence: ReportCadence::Daily,
            send_hour,
            weekday: None,
        }
    }

    pub fn weekly(send_hour: u32, weekday: Weekday) -> Self {
        Self {
            cadence: ReportCadence::Weekly,
            send_hour,
            weekday: Some(weekday),
        }
    }

    /// Whether `now` falls inside the send window, ignoring markers.
    pub fn window_open<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        if now.hour() <= self.send_hour {
            return false;
        }
        match self.weekday {
            Some(weekday) => now.weekday() == weekday,
            None => true,
        }
    }
}
