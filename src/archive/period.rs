//! Calendar period keys.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

/// Weekdays in ISO order, Monday first.
pub const ISO_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// English weekday name used for directory and file names.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// (ISO year, ISO week, weekday) bucket of a timestamp.
///
/// Weeks start on Monday and week 1 is the first week with at least four
/// days in the new year. The year is the ISO week-numbering year, so the
/// last days of December can belong to week 1 of the following year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    /// ISO week-numbering year.
    pub year: i32,
    /// ISO week number (1-53).
    pub week: u32,
    /// Day of the week.
    pub weekday: Weekday,
}

impl PeriodKey {
    /// Derive the key from a timestamp in its own time zone.
    pub fn from_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> Self {
        let date = ts.date_naive();
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
            weekday: date.weekday(),
        }
    }

    /// `{year}/{week}` relative to the archive root.
    pub fn week_dir(&self) -> PathBuf {
        PathBuf::from(self.year.to_string()).join(self.week.to_string())
    }

    /// `{year}/{week}/{weekday}` relative to the archive root.
    pub fn day_dir(&self) -> PathBuf {
        self.week_dir().join(weekday_name(self.weekday))
    }

    /// `{weekday}.csv`
    pub fn record_file_name(&self) -> String {
        format!("{}.csv", weekday_name(self.weekday))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-W{:02}-{}",
            self.year,
            self.week,
            weekday_name(self.weekday)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 15, 0)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap()
    }

    #[test]
    fn test_period_key_is_deterministic() {
        let ts = at(2026, 10, 20, 9);
        assert_eq!(PeriodKey::from_timestamp(&ts), PeriodKey::from_timestamp(&ts));
        assert_eq!(
            PeriodKey::from_timestamp(&ts).day_dir(),
            PathBuf::from("2026").join("43").join("Tuesday")
        );
    }

    #[test]
    fn test_same_week_different_days() {
        // Tuesday and Thursday of ISO week 43, 2026.
        let tue = PeriodKey::from_timestamp(&at(2026, 10, 20, 1));
        let thu = PeriodKey::from_timestamp(&at(2026, 10, 22, 23));

        assert_eq!((tue.year, tue.week), (thu.year, thu.week));
        assert_eq!(tue.week_dir(), thu.week_dir());
        assert_ne!(tue.day_dir(), thu.day_dir());
        assert_eq!(tue.weekday, Weekday::Tue);
        assert_eq!(thu.weekday, Weekday::Thu);
    }

    #[test]
    fn test_week_starts_on_monday() {
        let sunday = PeriodKey::from_timestamp(&at(2026, 10, 25, 12));
        let monday = PeriodKey::from_timestamp(&at(2026, 10, 26, 12));
        assert_eq!(sunday.week, 43);
        assert_eq!(monday.week, 44);
    }

    #[test]
    fn test_year_boundary_uses_iso_year() {
        // 2024-12-31 is a Tuesday in ISO week 1 of 2025.
        let key = PeriodKey::from_timestamp(&at(2024, 12, 31, 10));
        assert_eq!((key.year, key.week), (2025, 1));

        // 2021-01-01 is a Friday in ISO week 53 of 2020.
        let key = PeriodKey::from_timestamp(&at(2021, 1, 1, 10));
        assert_eq!((key.year, key.week), (2020, 53));
    }

    #[test]
    fn test_first_four_day_week_rule() {
        // 2026-01-01 is a Thursday: that week has four days in 2026.
        let key = PeriodKey::from_timestamp(&at(2026, 1, 1, 10));
        assert_eq!((key.year, key.week), (2026, 1));
    }

    #[test]
    fn test_local_date_decides_bucket() {
        // 01:15 at +02:00 on Tuesday is still Monday in UTC.
        let tuesday_early = at(2026, 10, 20, 1);
        assert_eq!(PeriodKey::from_timestamp(&tuesday_early).weekday, Weekday::Tue);
    }

    #[test]
    fn test_display() {
        let key = PeriodKey::from_timestamp(&at(2026, 3, 2, 8));
        assert_eq!(key.to_string(), "2026-W10-Monday");
        assert_eq!(key.record_file_name(), "Monday.csv");
    }
}
