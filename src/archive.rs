//! On-disk archive of trace summaries and report markers.
//!
//! Layout under the archive root:
//!
//! ```text
//! {year}/{week}/weekly-report-sent
//! {year}/{week}/{Weekday}/{Weekday}.csv
//! {year}/{week}/{Weekday}/daily-report-sent
//! ```
//!
//! The archive is the only writer of these files. Cycles run one after
//! another, so a record is never appended to by two writers at once.

mod error;
mod period;
mod record;

pub use error::ArchiveError;
pub use period::{ISO_WEEKDAYS, PeriodKey, weekday_name};
pub use record::{ArchiveRow, HEADER, append, exists, read_rows};

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::classify::TraceSummary;
use crate::report::ReportCadence;

/// Where the records and markers for one timestamp live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    pub key: PeriodKey,
    /// `{root}/{year}/{week}`
    pub week_dir: PathBuf,
    /// `{root}/{year}/{week}/{Weekday}`
    pub day_dir: PathBuf,
    /// `{root}/{year}/{week}/{Weekday}/{Weekday}.csv`
    pub record: PathBuf,
}

/// Archive rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the period key and paths for a timestamp. Pure.
    pub fn locate<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>) -> ArchiveLocation {
        self.location_of(PeriodKey::from_timestamp(timestamp))
    }

    /// Paths for an already derived period key.
    pub fn location_of(&self, key: PeriodKey) -> ArchiveLocation {
        let week_dir = self.root.join(key.week_dir());
        let day_dir = self.root.join(key.day_dir());
        let record = day_dir.join(key.record_file_name());
        ArchiveLocation {
            key,
            week_dir,
            day_dir,
            record,
        }
    }

    /// Create the directories of `location` if missing.
    pub fn ensure(&self, location: &ArchiveLocation) -> Result<(), ArchiveError> {
        std::fs::create_dir_all(&location.day_dir)
            .map_err(|e| ArchiveError::io(&location.day_dir, e))
    }

    /// Append a cycle's summaries to the record for `timestamp`.
    ///
    /// Returns the location written to and the number of rows appended.
    pub fn record_cycle<Tz: TimeZone>(
        &self,
        timestamp: &DateTime<Tz>,
        summaries: &[TraceSummary],
    ) -> Result<(ArchiveLocation, usize), ArchiveError> {
        let location = self.locate(timestamp);
        self.ensure(&location)?;
        let rows = append(&location.record, timestamp.fixed_offset(), summaries)?;
        Ok((location, rows))
    }

    /// Record files of every weekday present in the week of `key`, Monday first.
    pub fn week_records(&self, key: PeriodKey) -> Vec<PathBuf> {
        ISO_WEEKDAYS
            .iter()
            .map(|&weekday| self.location_of(PeriodKey { weekday, ..key }).record)
            .filter(|path| exists(path))
            .collect()
    }

    /// Marker file for `cadence` in the period of `location`.
    pub fn marker_path(&self, location: &ArchiveLocation, cadence: ReportCadence) -> PathBuf {
        match cadence {
            ReportCadence::Daily => location.day_dir.join(cadence.marker_file_name()),
            ReportCadence::Weekly => location.week_dir.join(cadence.marker_file_name()),
        }
    }

    /// Whether a report for `cadence` was already dispatched in this period.
    pub fn has_marker(&self, location: &ArchiveLocation, cadence: ReportCadence) -> bool {
        self.marker_path(location, cadence).exists()
    }

    /// Record that a report for `cadence` was dispatched in this period.
    pub fn write_marker(
        &self,
        location: &ArchiveLocation,
        cadence: ReportCadence,
        contents: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.marker_path(location, cadence);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        std::fs::write(&path, contents).map_err(|e| ArchiveError::io(&path, e))?;
        Ok(path)
    }
}
