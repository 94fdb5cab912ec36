//! Timestamp parsing and calendar-month helpers.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Lenient timestamp parse. Returns `None` for anything unrecognised.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Whole calendar months from `from` to `to` (day-of-month ignored).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// Difference in whole days, floored (so -1h counts as -1 day).
pub fn floor_days(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    (later - earlier).num_seconds().div_euclid(86_400)
}

pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS
}

pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_CE_DAYS)?)
}

/// `2021-03-01` -> `2021-03`
pub fn month_label(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn parses_olist_formats() {
        assert_eq!(
            ts("2017-10-02 10:56:33").date(),
            NaiveDate::from_ymd_opt(2017, 10, 2).unwrap()
        );
        assert!(parse_timestamp("2017-10-02T10:56:33.250").is_some());
        assert!(parse_timestamp("2018-01-18").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn calendar_month_offsets() {
        let jan31 = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        let feb1 = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        let mar1_next = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();

        assert_eq!(months_between(jan31, feb1), 1);
        assert_eq!(months_between(jan31, mar1_next), 14);
        assert_eq!(month_start(jan31), NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn delay_is_floored() {
        assert_eq!(floor_days(ts("2021-01-01 23:00:00"), ts("2021-01-02 00:00:00")), -1);
        assert_eq!(floor_days(ts("2021-01-05 12:00:00"), ts("2021-01-02 00:00:00")), 3);
    }

    #[test]
    fn epoch_day_conversion() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(epoch_days(d), 1);
        assert_eq!(date_from_epoch_days(1), Some(d));
    }
}
