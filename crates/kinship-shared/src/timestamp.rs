//! Calendar timestamps with second precision.
//!
//! A [`Timestamp`] is a plain value: constructing one never fails, and
//! [`Timestamp::is_valid`] reports whether the six fields form a legal
//! proleptic Gregorian date-time. The canonical text form is `YYYY-MM-DD`
//! when the time of day is midnight and `YYYY-MM-DD HH:MM:SS` otherwise;
//! [`FromStr`] accepts both, so encoding then decoding always yields an equal
//! value.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DAYS_IN_MONTH: [i32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// An immutable calendar date and time of day.
///
/// Field order matters: the derived ordering compares year, then month, day,
/// hour, minute and second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    year: i32,
    month: i32,
    day: i32,
    hour: i32,
    minute: i32,
    second: i32,
}

impl Timestamp {
    /// A date at midnight.
    pub fn new(day: i32, month: i32, year: i32) -> Self {
        Self::with_time(day, month, year, 0, 0, 0)
    }

    /// A date with hour and minute; seconds are zero.
    pub fn with_minutes(day: i32, month: i32, year: i32, hour: i32, minute: i32) -> Self {
        Self::with_time(day, month, year, hour, minute, 0)
    }

    pub fn with_time(day: i32, month: i32, year: i32, hour: i32, minute: i32, second: i32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Current local wall-clock time.
    pub fn now() -> Self {
        Self::from_chrono(&chrono::Local::now().naive_local())
    }

    pub fn from_chrono(dt: &NaiveDateTime) -> Self {
        Self::with_time(
            dt.day() as i32,
            dt.month() as i32,
            dt.year(),
            dt.hour() as i32,
            dt.minute() as i32,
            dt.second() as i32,
        )
    }

    /// `None` when the value is not a legal calendar date-time.
    pub fn to_chrono(&self) -> Option<NaiveDateTime> {
        if !self.is_valid() {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }

    /// Shift by a number of seconds, carrying across minutes, days and years.
    pub fn checked_add_seconds(&self, seconds: i64) -> Option<Self> {
        let shifted = self.to_chrono()?.checked_add_signed(Duration::seconds(seconds))?;
        Some(Self::from_chrono(&shifted))
    }

    pub fn day(&self) -> i32 {
        self.day
    }

    pub fn month(&self) -> i32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn hour(&self) -> i32 {
        self.hour
    }

    pub fn minute(&self) -> i32 {
        self.minute
    }

    pub fn second(&self) -> i32 {
        self.second
    }

    pub fn is_leap_year(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    /// Number of days in `month` of `year`, or `None` for a month outside 1..=12.
    pub fn days_in_month(month: i32, year: i32) -> Option<i32> {
        if !(1..=12).contains(&month) {
            return None;
        }
        if month == 2 && Self::is_leap_year(year) {
            return Some(29);
        }
        Some(DAYS_IN_MONTH[(month - 1) as usize])
    }

    pub fn is_valid(&self) -> bool {
        let Some(max_day) = Self::days_in_month(self.month, self.year) else {
            return false;
        };
        (1..=max_day).contains(&self.day)
            && (0..=23).contains(&self.hour)
            && (0..=59).contains(&self.minute)
            && (0..=59).contains(&self.second)
    }

    fn has_time_of_day(&self) -> bool {
        self.hour != 0 || self.minute != 0 || self.second != 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year < 0 {
            f.write_str("-")?;
        }
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year.unsigned_abs(),
            self.month,
            self.day
        )?;
        if self.has_time_of_day() {
            write!(f, " {:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        }
        Ok(())
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::validation(format!("Invalid timestamp: {s:?}"));

        let (date, time) = match s.split_once(' ') {
            Some((date, time)) => (date, Some(time)),
            None => (s, None),
        };

        let (negative, date) = match date.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, date),
        };
        let [year, month, day] = parse_fields(date, '-').ok_or_else(malformed)?;
        // i32::MIN has no positive counterpart, so negate before narrowing.
        let year = i32::try_from(if negative { -year } else { year }).map_err(|_| malformed())?;
        let [month, day] = narrow([month, day]).ok_or_else(malformed)?;

        let [hour, minute, second] = match time {
            Some(time) => narrow(parse_fields(time, ':').ok_or_else(malformed)?).ok_or_else(malformed)?,
            None => [0, 0, 0],
        };

        let ts = Self::with_time(day, month, year, hour, minute, second);
        if !ts.is_valid() {
            return Err(malformed());
        }
        Ok(ts)
    }
}

/// Split `s` into exactly three unsigned decimal fields.
fn parse_fields(s: &str, separator: char) -> Option<[i64; 3]> {
    let mut fields = [0; 3];
    let mut parts = s.split(separator);
    for field in &mut fields {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *field = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(fields)
}

fn narrow<const N: usize>(fields: [i64; N]) -> Option<[i32; N]> {
    let mut out = [0; N];
    for (slot, value) in out.iter_mut().zip(fields) {
        *slot = i32::try_from(value).ok()?;
    }
    Some(out)
}

impl TryFrom<String> for Timestamp {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_string()
    }
}
