//! Calendar policy: weekends, holidays and the weekly demand tier.
//!
//! Every function here is pure and total over valid dates. Holidays are
//! looked up in literal per-domain tables (see [`holidays`]) rather than
//! derived from rules, so the generated series line up with the reports that
//! were tuned against them.

pub mod holidays;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Demand tier of a day within the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeeklyTier {
    /// Monday through Thursday.
    Lower,
    /// Friday.
    Normal,
    /// Saturday and Sunday.
    Peak,
}

impl std::fmt::Display for WeeklyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeeklyTier::Lower => write!(f, "Lower"),
            WeeklyTier::Normal => write!(f, "Normal"),
            WeeklyTier::Peak => write!(f, "Peak"),
        }
    }
}

/// True iff the date falls on a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True iff the date is in the domain's holiday table.
pub fn is_holiday(domain: Domain, date: NaiveDate) -> bool {
    holidays::table(domain).contains(&date)
}

pub fn weekly_tier(date: NaiveDate) -> WeeklyTier {
    match date.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => WeeklyTier::Lower,
        Weekday::Fri => WeeklyTier::Normal,
        Weekday::Sat | Weekday::Sun => WeeklyTier::Peak,
    }
}

/// Calendar attributes of one day, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub weekly_tier: WeeklyTier,
}

impl CalendarDay {
    pub fn new(domain: Domain, date: NaiveDate) -> Self {
        Self {
            date,
            is_weekend: is_weekend(date),
            is_holiday: is_holiday(domain, date),
            weekly_tier: weekly_tier(date),
        }
    }
}

/// Iterate every day of `year`, January 1st through December 31st.
pub fn days_of_year(year: i32) -> impl Iterator<Item = NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    first
        .into_iter()
        .flat_map(|d| d.iter_days())
        .take_while(move |d| d.year() == year)
}
