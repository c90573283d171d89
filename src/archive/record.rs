//! CSV archive rows.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::error::ArchiveError;
use crate::classify::TraceSummary;

/// Header row shared by every archive record.
pub const HEADER: [&str; 6] = [
    "time",
    "destination",
    "totalHops",
    "hopTimeouts",
    "slowHops",
    "success",
];

/// One archived trace summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRow {
    /// Cycle timestamp, shared by all rows of a cycle.
    pub time: DateTime<FixedOffset>,
    pub destination: String,
    pub total_hops: usize,
    pub hop_timeouts: usize,
    pub slow_hops: usize,
    pub success: bool,
}

impl ArchiveRow {
    /// Row for `summary` observed in the cycle started at `time`.
    pub fn from_summary(time: DateTime<FixedOffset>, summary: &TraceSummary) -> Self {
        Self {
            time,
            destination: summary.destination.clone(),
            total_hops: summary.total_hops,
            hop_timeouts: summary.timeouts,
            slow_hops: summary.slow_hops,
            success: summary.success,
        }
    }
}

/// Whether a record file exists at `path`.
pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// Append one cycle's summaries to the record at `path`.
///
/// The header is written only when the record is new or empty. The whole
/// batch is encoded first and handed to the filesystem in a single write;
/// bytes already written are never rolled back.
///
/// # Errors
/// Returns `ArchiveError` if encoding or the write fails. The caller must
/// then treat the whole batch as lost.
pub fn append(
    path: &Path,
    time: DateTime<FixedOffset>,
    summaries: &[TraceSummary],
) -> Result<usize, ArchiveError> {
    let fresh = match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(ArchiveError::io(path, e)),
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if fresh {
        writer.write_record(HEADER)?;
    }
    for summary in summaries {
        writer.serialize(ArchiveRow::from_summary(time, summary))?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| ArchiveError::io(path, e.into_error()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ArchiveError::io(path, e))?;
    file.write_all(&buffer)
        .and_then(|()| file.flush())
        .map_err(|e| ArchiveError::io(path, e))?;

    Ok(summaries.len())
}

/// Read every well-formed row of the record at `path`.
///
/// Malformed rows are skipped with a warning.
pub fn read_rows(path: &Path) -> Result<Vec<ArchiveRow>, ArchiveError> {
    let file = std::fs::File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<ArchiveRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(
                path = %path.display(),
                row = line + 1,
                error = %e,
                "Skipping malformed archive row"
            ),
        }
    }
    Ok(rows)
}
