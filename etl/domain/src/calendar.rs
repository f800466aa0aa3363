use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Surrogate key for a calendar date: YYYYMMDD as an integer.
pub fn date_key(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

pub fn date_from_key(key: i64) -> Option<NaiveDate> {
    let year = (key / 10_000) as i32;
    let month = ((key / 100) % 100) as u32;
    let day = (key % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// One row of the calendar dimension. `day_of_week` follows the ISO
/// convention, Monday=1 through Sunday=7, not the zero-indexed-from-Sunday
/// convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub date_key: i64,
    pub date: NaiveDate,
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
    pub week_start_date: NaiveDate,
    pub month: u32,
    pub month_name: String,
    pub quarter: u32,
    pub year: i32,
}

impl CalendarRow {
    pub fn for_date(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().number_from_monday();
        let week_start_date = date
            .checked_sub_days(Days::new(u64::from(day_of_week - 1)))
            .expect("week start underflow");
        let month = date.month();

        Self {
            date_key: date_key(date),
            date,
            day_of_week,
            day_name: day_name(date.weekday()).to_string(),
            is_weekend: day_of_week >= 6,
            week_start_date,
            month,
            month_name: MONTH_NAMES[(month - 1) as usize].to_string(),
            quarter: (month - 1) / 3 + 1,
            year: date.year(),
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn day_name(weekday: Weekday) -> &'static str {
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

/// Builds the calendar dimension for a set of distinct dates, ordered by
/// date_key. Deterministic: the same input set always yields identical rows,
/// which is what makes truncate-and-reload of the dimension safe.
pub fn build_calendar(dates: &BTreeSet<NaiveDate>) -> Vec<CalendarRow> {
    dates.iter().map(|date| CalendarRow::for_date(*date)).collect()
}

/// Membership index over the calendar dimension, consulted by the merger
/// before any fact row is written.
#[derive(Debug, Clone, Default)]
pub struct CalendarIndex {
    keys: HashSet<i64>,
}

impl CalendarIndex {
    pub fn from_rows(rows: &[CalendarRow]) -> Self {
        Self {
            keys: rows.iter().map(|row| row.date_key).collect(),
        }
    }

    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            keys: dates.into_iter().map(date_key).collect(),
        }
    }

    pub fn contains(&self, key: i64) -> bool {
        self.keys.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
