//! Hourly metric synthesis: seasonal baselines plus anomaly overrides.

pub mod resource;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::calendar::{CalendarDay, WeeklyTier};
use crate::domain::profile::Band;
use crate::domain::{AnomalyCategory, AnomalyEffect, Domain, DomainProfile};
use crate::schedule::ScheduleCell;

pub use resource::{Application, Resource};

/// One hour of activity for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub resource_id: String,
    pub location: String,
    pub timestamp: NaiveDateTime,
    pub transactions: u32,
    /// Seconds, 2 decimals.
    pub average_transaction_time: f64,
    pub error_count: u32,
    /// Currency units, 4 decimals.
    pub cost: f64,
    /// Fraction of capacity, 2 decimals.
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub anomaly_categories: BTreeSet<AnomalyCategory>,
}

impl MetricSample {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn gauss<R: Rng>(rng: &mut R, mean: f64, rel_sd: f64) -> f64 {
    Normal::new(mean, (mean * rel_sd).abs())
        .map(|n| n.sample(rng))
        .unwrap_or(mean)
}

fn uniform_band<R: Rng>(rng: &mut R, center: f64, band: &Band) -> f64 {
    let lo = (center - band.spread).max(band.floor);
    let hi = (center + band.spread).min(band.ceiling);
    if lo < hi {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Transaction-side numbers before rounding.
#[derive(Debug, Clone, Copy)]
struct Activity {
    transactions: u32,
    avg_time: f64,
    errors: u32,
}

/// Produces [`MetricSample`]s for a domain.
#[derive(Debug, Clone)]
pub struct MetricSynthesizer {
    profile: &'static DomainProfile,
}

impl MetricSynthesizer {
    pub fn new(domain: Domain) -> Self {
        Self { profile: domain.profile() }
    }

    /// Expected transaction count for the hour, before noise.
    pub fn transactions_base(&self, day: &CalendarDay, hour: u32) -> f64 {
        let a = &self.profile.activity;
        let peak = self.profile.is_peak_hour(hour);
        let mut base = a.base_transactions;
        if peak {
            base *= a.peak_hour;
        }
        if day.is_weekend {
            base *= a.weekend;
        } else if day.weekly_tier == WeeklyTier::Normal {
            base *= a.friday;
        }
        if day.is_holiday {
            base *= a.holiday;
        }
        if peak || !a.seasonal_peak_only {
            base *= a.seasonal_factor(day.date.month(), day.date.day());
        }
        base
    }

    pub fn transaction_time_base(&self, day: &CalendarDay, hour: u32) -> f64 {
        let a = &self.profile.activity;
        let mut base = a.base_transaction_time;
        if day.is_weekend && self.profile.is_peak_hour(hour) {
            base *= a.weekend_peak_latency;
        }
        if day.is_holiday {
            base *= a.holiday_latency;
        }
        base
    }

    pub fn cost_base(&self, day: &CalendarDay, hour: u32) -> f64 {
        let c = &self.profile.cost;
        let mut base = c.base;
        if self.profile.is_peak_hour(hour) {
            base *= c.peak_hour;
        }
        if day.is_weekend {
            base *= c.weekend;
        }
        if day.is_holiday {
            base *= c.holiday;
        }
        base
    }

    pub fn utilization_base(&self, day: &CalendarDay, hour: u32) -> f64 {
        let u = &self.profile.utilization;
        let mut base = u.base;
        if self.profile.is_peak_hour(hour) {
            base += u.peak_hour_add;
        }
        if day.is_weekend {
            base += u.weekend_add;
        }
        if day.is_holiday {
            base += u.holiday_add;
        }
        base
    }

    /// Synthesize one hour. `cell` is the schedule entry for this
    /// `(date, location)`, if any.
    pub fn sample<R: Rng>(
        &self,
        rng: &mut R,
        day: &CalendarDay,
        hour: u32,
        resource: &Resource,
        cell: Option<&ScheduleCell>,
    ) -> MetricSample {
        let a = &self.profile.activity;
        let tx_base = self.transactions_base(day, hour);
        let time_base = self.transaction_time_base(day, hour);

        let mut activity = Activity {
            transactions: gauss(rng, tx_base, a.transactions_rel_sd).max(0.0).floor() as u32,
            avg_time: gauss(rng, time_base, a.latency_rel_sd).max(a.min_transaction_time),
            errors: Exp::new(a.error_rate).map(|e| e.sample(rng)).unwrap_or(0.0).floor() as u32,
        };

        let categories = cell.map(|c| c.active_at(hour)).unwrap_or_default();
        self.apply_overrides(rng, &mut activity, &categories);

        let c = &self.profile.cost;
        let cost_base = self.cost_base(day, hour);
        let cost = rng.gen_range(cost_base * (1.0 - c.spread)..=cost_base * (1.0 + c.spread));

        let util_base = self.utilization_base(day, hour);
        let cpu = uniform_band(rng, util_base, &self.profile.utilization.cpu);
        let memory = uniform_band(rng, util_base, &self.profile.utilization.memory);

        MetricSample {
            resource_id: resource.resource_id.clone(),
            location: resource.location.clone(),
            timestamp: day.date.and_hms_opt(hour, 0, 0).unwrap_or_default(),
            transactions: activity.transactions,
            average_transaction_time: round_to(activity.avg_time, 2),
            error_count: activity.errors,
            cost: round_to(cost, 4),
            cpu_utilization: round_to(cpu, 2),
            memory_utilization: round_to(memory, 2),
            anomaly_categories: categories,
        }
    }

    fn apply_overrides<R: Rng>(
        &self,
        rng: &mut R,
        activity: &mut Activity,
        categories: &BTreeSet<AnomalyCategory>,
    ) {
        let mut effects: Vec<AnomalyEffect> = categories.iter().map(|c| c.effect()).collect();
        effects.sort_by_key(AnomalyEffect::precedence);

        for effect in effects {
            match effect {
                AnomalyEffect::Surge { factor, latency_factor } => {
                    activity.transactions = (activity.transactions as f64 * factor).round() as u32;
                    activity.avg_time *= latency_factor;
                }
                AnomalyEffect::Throttle { factor } => {
                    activity.transactions = (activity.transactions as f64 * factor).floor() as u32;
                }
                AnomalyEffect::Degradation => {
                    activity.avg_time *= 1.0 + rng.gen_range(0.3..=0.7);
                }
                AnomalyEffect::TechnicalFault { volume_factor } => {
                    activity.errors = rng.gen_range(10..=30);
                    activity.transactions =
                        (activity.transactions as f64 * volume_factor).floor() as u32;
                }
                AnomalyEffect::Outage => {
                    activity.transactions = 0;
                }
                AnomalyEffect::Shutdown => {
                    activity.transactions = 0;
                    activity.avg_time = 0.0;
                    activity.errors = 0;
                }
            }
        }
    }
}
