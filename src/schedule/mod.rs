//! Anomaly schedule: calendar-anchored events compiled into per-cell lookups.
//!
//! Events are static configuration. [`AnomalySchedule::compile`] groups them by
//! `(date, location)` so the generators can ask "is anything wrong here
//! today?" in constant time. When several events for one cell carry an hour,
//! the last one in list order wins the cell's `hour`.

pub mod builtin;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use crate::domain::AnomalyCategory;

/// Hour used for incident timing when no event in a cell fixes one.
pub const DEFAULT_TRIGGER_HOUR: u32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{date} {location}: hour {hour} is outside 0-23")]
    InvalidHour { date: NaiveDate, location: String, hour: u32 },

    #[error("{date} {location}: hour range {start}-{end} is empty or exceeds 24")]
    InvalidRange { date: NaiveDate, location: String, start: u32, end: u32 },

    #[error("{date} {location}: an event may set `hour` or `start_hour`/`end_hour`, not both")]
    ConflictingHours { date: NaiveDate, location: String },

    #[error("{date} {location}: `start_hour` and `end_hour` must be given together")]
    HalfRange { date: NaiveDate, location: String },
}

/// One scripted anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub date: NaiveDate,
    pub location: String,
    #[serde(alias = "type")]
    pub category: AnomalyCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u32>,
    /// Exclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u32>,
}

impl AnomalyEvent {
    pub fn new(date: NaiveDate, location: impl Into<String>, category: AnomalyCategory) -> Self {
        Self {
            date,
            location: location.into(),
            category,
            hour: None,
            start_hour: None,
            end_hour: None,
        }
    }

    pub fn at_hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn between(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.start_hour = Some(start_hour);
        self.end_hour = Some(end_hour);
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        let (date, location) = (self.date, self.location.clone());
        match (self.hour, self.start_hour, self.end_hour) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                Err(ScheduleError::ConflictingHours { date, location })
            }
            (Some(hour), None, None) if hour > 23 => {
                Err(ScheduleError::InvalidHour { date, location, hour })
            }
            (None, Some(start), Some(end)) if start >= end || end > 24 => {
                Err(ScheduleError::InvalidRange { date, location, start, end })
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                Err(ScheduleError::HalfRange { date, location })
            }
            _ => Ok(()),
        }
    }

    pub fn window(&self) -> HourWindow {
        match (self.hour, self.start_hour, self.end_hour) {
            (Some(h), _, _) => HourWindow::Hour(h),
            (None, Some(start), Some(end)) => HourWindow::Range { start, end },
            _ => HourWindow::AllDay,
        }
    }
}

/// Hours of a day during which a category's metric override applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HourWindow {
    AllDay,
    Hour(u32),
    /// Half-open `[start, end)`.
    Range { start: u32, end: u32 },
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        match *self {
            HourWindow::AllDay => hour < 24,
            HourWindow::Hour(h) => h == hour,
            HourWindow::Range { start, end } => (start..end).contains(&hour),
        }
    }
}

/// Everything scheduled for one `(date, location)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleCell {
    pub categories: BTreeSet<AnomalyCategory>,
    /// Last explicit `hour` among the cell's events.
    pub hour: Option<u32>,
    windows: BTreeMap<AnomalyCategory, HourWindow>,
}

impl ScheduleCell {
    fn add(&mut self, event: &AnomalyEvent) {
        self.categories.insert(event.category);
        self.windows.insert(event.category, event.window());
        if let Some(h) = event.hour {
            self.hour = Some(h);
        }
    }

    pub fn window(&self, category: AnomalyCategory) -> Option<HourWindow> {
        self.windows.get(&category).copied()
    }

    /// Categories whose window covers `hour`.
    pub fn active_at(&self, hour: u32) -> BTreeSet<AnomalyCategory> {
        self.windows
            .iter()
            .filter(|(_, w)| w.contains(hour))
            .map(|(c, _)| *c)
            .collect()
    }

    /// Hour at which a one-off incident for `category` starts.
    pub fn trigger_hour(&self, category: AnomalyCategory) -> u32 {
        match self.window(category) {
            Some(HourWindow::Hour(h)) => h,
            Some(HourWindow::Range { start, .. }) => start,
            _ => self.hour.unwrap_or(DEFAULT_TRIGGER_HOUR),
        }
    }
}

/// Compiled lookup over a list of [`AnomalyEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct AnomalySchedule {
    cells: HashMap<NaiveDate, HashMap<String, ScheduleCell>>,
}

impl AnomalySchedule {
    /// Group events by `(date, location)`. Order matters only for the cell
    /// `hour` and for a category listed twice in one cell: later entries win.
    pub fn compile(events: &[AnomalyEvent]) -> Self {
        let mut cells: HashMap<NaiveDate, HashMap<String, ScheduleCell>> = HashMap::new();
        for event in events {
            cells
                .entry(event.date)
                .or_default()
                .entry(event.location.clone())
                .or_default()
                .add(event);
        }
        Self { cells }
    }

    pub fn lookup(&self, date: NaiveDate, location: &str) -> Option<&ScheduleCell> {
        self.cells.get(&date).and_then(|by_loc| by_loc.get(location))
    }

    /// Number of `(date, location)` cells.
    pub fn len(&self) -> usize {
        self.cells.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cells ordered by date, then location.
    pub fn cells(&self) -> Vec<(NaiveDate, &str, &ScheduleCell)> {
        let mut out: Vec<_> = self
            .cells
            .iter()
            .flat_map(|(date, by_loc)| by_loc.iter().map(move |(loc, cell)| (*date, loc.as_str(), cell)))
            .collect();
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnomalyCategory::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_explicit_hour_wins_regardless_of_order() {
        let d = date(2024, 2, 22);
        let with_hour = AnomalyEvent::new(d, "Houston", HardwareFailure).at_hour(12);
        let without = AnomalyEvent::new(d, "Houston", EmployeeInefficiency);

        for events in [vec![with_hour.clone(), without.clone()], vec![without, with_hour]] {
            let schedule = AnomalySchedule::compile(&events);
            let cell = schedule.lookup(d, "Houston").unwrap();
            assert_eq!(cell.hour, Some(12));
            assert_eq!(cell.categories.len(), 2);
            assert!(cell.categories.contains(&HardwareFailure));
            assert!(cell.categories.contains(&EmployeeInefficiency));
            assert_eq!(schedule.len(), 1);
        }
    }

    #[test]
    fn test_last_hour_wins() {
        let d = date(2024, 3, 1);
        let events = vec![
            AnomalyEvent::new(d, "Plano", SystemMalfunction).at_hour(9),
            AnomalyEvent::new(d, "Plano", HardwareFailure).at_hour(15),
        ];
        let schedule = AnomalySchedule::compile(&events);
        assert_eq!(schedule.lookup(d, "Plano").unwrap().hour, Some(15));
    }

    #[test]
    fn test_duplicate_events_are_idempotent() {
        let d = date(2024, 5, 5);
        let e = AnomalyEvent::new(d, "Plano", UnauthorizedShutdown);
        let once = AnomalySchedule::compile(&[e.clone()]);
        let twice = AnomalySchedule::compile(&[e.clone(), e]);
        assert_eq!(once.lookup(d, "Plano"), twice.lookup(d, "Plano"));
    }

    #[test]
    fn test_lookup_misses() {
        let d = date(2024, 1, 1);
        let schedule = AnomalySchedule::compile(&[AnomalyEvent::new(d, "Austin", SystemMalfunction)]);
        assert!(schedule.lookup(d, "Houston").is_none());
        assert!(schedule.lookup(date(2024, 1, 2), "Austin").is_none());
    }

    #[test]
    fn test_windows_scope_active_categories() {
        let d = date(2024, 1, 1);
        let schedule = AnomalySchedule::compile(&[
            AnomalyEvent::new(d, "Austin", NetworkConnectivityLoss).between(10, 13),
            AnomalyEvent::new(d, "Austin", SignificantTechnicalProblem).at_hour(15),
            AnomalyEvent::new(d, "Austin", UnauthorizedShutdown),
        ]);
        let cell = schedule.lookup(d, "Austin").unwrap();
        assert!(cell.active_at(9).contains(&UnauthorizedShutdown));
        assert!(!cell.active_at(9).contains(&NetworkConnectivityLoss));
        assert!(cell.active_at(12).contains(&NetworkConnectivityLoss));
        assert!(!cell.active_at(13).contains(&NetworkConnectivityLoss));
        assert_eq!(cell.active_at(15).len(), 2);
        assert_eq!(cell.trigger_hour(NetworkConnectivityLoss), 10);
        assert_eq!(cell.trigger_hour(SignificantTechnicalProblem), 15);
        assert_eq!(cell.trigger_hour(UnauthorizedShutdown), 15);
    }

    #[test]
    fn test_trigger_hour_defaults_to_noon() {
        let d = date(2024, 2, 20);
        let schedule = AnomalySchedule::compile(&[AnomalyEvent::new(d, "Austin", SystemMalfunction)]);
        let cell = schedule.lookup(d, "Austin").unwrap();
        assert_eq!(cell.hour, None);
        assert_eq!(cell.trigger_hour(SystemMalfunction), DEFAULT_TRIGGER_HOUR);
    }

    #[test]
    fn test_event_validation() {
        let d = date(2024, 1, 1);
        assert!(AnomalyEvent::new(d, "A", SystemMalfunction).at_hour(23).validate().is_ok());
        assert!(matches!(
            AnomalyEvent::new(d, "A", SystemMalfunction).at_hour(24).validate(),
            Err(ScheduleError::InvalidHour { hour: 24, .. })
        ));
        assert!(matches!(
            AnomalyEvent::new(d, "A", SystemMalfunction).between(13, 10).validate(),
            Err(ScheduleError::InvalidRange { .. })
        ));
        assert!(matches!(
            AnomalyEvent::new(d, "A", SystemMalfunction).at_hour(3).between(1, 4).validate(),
            Err(ScheduleError::ConflictingHours { .. })
        ));
        let mut half = AnomalyEvent::new(d, "A", SystemMalfunction);
        half.start_hour = Some(4);
        assert!(matches!(half.validate(), Err(ScheduleError::HalfRange { .. })));
    }

    #[test]
    fn test_event_deserializes_with_type_alias() {
        let event: AnomalyEvent = toml::from_str(
            r#"
            date = "2024-01-01"
            location = "Austin"
            type = "Network Connectivity Loss"
            start_hour = 10
            end_hour = 13
            "#,
        )
        .unwrap();
        assert_eq!(event.category, NetworkConnectivityLoss);
        assert_eq!(event.window(), HourWindow::Range { start: 10, end: 13 });
    }
}
