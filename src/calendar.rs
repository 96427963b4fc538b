//! ISO-8601 Week Arithmetic
//! 
//! Weeks run Monday through Sunday and are anchored on their Thursday: the
//! Thursday decides both the week-year and the week number. An inventory act is
//! filed under the week it closes, and its scheduled date is that week's Sunday.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// Keeps date construction inside the range chrono can represent.
const MIN_YEAR: i32 = -262_000;
const MAX_YEAR: i32 = 262_000;

/// An (ISO week number, ISO week-year) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    pub fn new(week: u32, year: i32) -> Self {
        Self { week, year }
    }

    pub fn of(date: NaiveDate) -> Self {
        iso_week_of(date)
    }

    pub fn sunday(&self) -> NaiveDate {
        sunday_of(self.week, self.year)
    }

    pub fn previous(&self) -> Self {
        previous_week(*self)
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.week, self.year)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year.clamp(MIN_YEAR, MAX_YEAR), month, day).unwrap_or_default()
}

/// Returns the ISO week number and ISO week-year of `date`.
///
/// The week-year differs from the calendar year only for the first and last
/// few days of a year.
pub fn iso_week_of(date: NaiveDate) -> IsoWeek {
    let from_monday = i64::from(date.weekday().num_days_from_monday());
    match date.checked_add_signed(Duration::days(3 - from_monday)) {
        Some(thursday) => IsoWeek {
            week: (thursday.ordinal() + 6) / 7,
            year: thursday.year(),
        },
        // The Thursday lies outside chrono's range.
        None => {
            let iso = date.iso_week();
            IsoWeek { week: iso.week(), year: iso.year() }
        }
    }
}

/// Returns the Sunday that closes ISO week `week` of `year`.
///
/// January 4 always falls in week 1, so its Monday anchors the count. Weeks
/// past the last week of `year` roll into the following year.
pub fn sunday_of(week: u32, year: i32) -> NaiveDate {
    let jan4 = ymd(year, 1, 4);
    let week1_monday = jan4 - Duration::days(i64::from(jan4.weekday().num_days_from_monday()));
    let offset = i64::from(week.clamp(1, 53) - 1) * 7;
    week1_monday + Duration::days(offset + 6)
}

/// Number of ISO weeks in `year` (52 or 53). December 28 always sits in the last one.
pub fn last_iso_week(year: i32) -> u32 {
    iso_week_of(ymd(year, 12, 28)).week
}

/// The ISO week immediately before `current`.
pub fn previous_week(current: IsoWeek) -> IsoWeek {
    if current.week > 1 {
        IsoWeek { week: current.week - 1, year: current.year }
    } else {
        let year = current.year - 1;
        IsoWeek { week: last_iso_week(year), year }
    }
}
