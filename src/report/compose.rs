//! Report aggregation and rendering.

use std::path::{Path, PathBuf};

use askama::Template;
use chrono::{DateTime, TimeZone};

use super::cadence::ReportCadence;
use crate::archive::{ArchiveRow, PeriodKey, read_rows};

/// Per-destination totals over a reporting period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationTotals {
    pub destination: String,
    /// Archive rows for the destination.
    pub traces: usize,
    pub successes: usize,
    pub hop_timeouts: usize,
    pub slow_hops: usize,
}

/// Aggregate of the archive rows covered by one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total_rows: usize,
    pub successes: usize,
    /// In order of first appearance.
    pub destinations: Vec<DestinationTotals>,
    /// File names of the records read.
    pub sources: Vec<String>,
}

impl ReportSummary {
    /// Read and aggregate every record in `paths`.
    ///
    /// Unreadable records are logged and left out of the report.
    pub fn from_records(paths: &[PathBuf]) -> Self {
        let mut summary = Self::default();
        for path in paths {
            match read_rows(path) {
                Ok(rows) => {
                    rows.iter().for_each(|row| summary.add(row));
                    summary.sources.push(file_name(path));
                }
                Err(e) => tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read archive record for report"
                ),
            }
        }
        summary
    }

    fn add(&mut self, row: &ArchiveRow) {
        self.total_rows += 1;
        if row.success {
            self.successes += 1;
        }

        let index = match self
            .destinations
            .iter()
            .position(|d| d.destination == row.destination)
        {
            Some(index) => index,
            None => {
                self.destinations.push(DestinationTotals {
                    destination: row.destination.clone(),
                    ..Default::default()
                });
                self.destinations.len() - 1
            }
        };

        let totals = &mut self.destinations[index];
        totals.traces += 1;
        totals.hop_timeouts += row.hop_timeouts;
        totals.slow_hops += row.slow_hops;
        if row.success {
            totals.successes += 1;
        }
    }

    pub fn failures(&self) -> usize {
        self.total_rows - self.successes
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A rendered report ready for a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub cadence: ReportCadence,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Subject line for the report covering `now`.
pub fn subject<Tz: TimeZone>(cadence: ReportCadence, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match cadence {
        ReportCadence::Daily => {
            format!("Network Monitor Report for {}", now.format("%A %B %Y"))
        }
        ReportCadence::Weekly => {
            let key = PeriodKey::from_timestamp(now);
            format!(
                "Weekly Network Monitor Report for week {} {}",
                key.week, key.year
            )
        }
    }
}

/// HTML body of a report.
#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    period: &'a str,
    summary: &'a ReportSummary,
}

/// Render the report for `cadence` covering `now`.
///
/// # Errors
/// Returns the template error if the body fails to render.
pub fn compose<Tz: TimeZone>(
    cadence: ReportCadence,
    now: &DateTime<Tz>,
    summary: &ReportSummary,
) -> Result<Report, askama::Error>
where
    Tz::Offset: std::fmt::Display,
{
    let period = match cadence {
        ReportCadence::Daily => "on this day",
        ReportCadence::Weekly => "during this week",
    };
    let body = ReportTemplate { period, summary }.render()?;

    Ok(Report {
        cadence,
        subject: subject(cadence, now),
        body,
    })
}
