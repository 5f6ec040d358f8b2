//! Per-day rollups of hourly samples.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::AnomalyCategory;
use crate::synth::{round_to, MetricSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub location: String,
    pub date: NaiveDate,
    pub transactions: u64,
    /// Mean of the hourly averages.
    pub average_transaction_time: f64,
    pub error_count: u64,
    pub cost: f64,
    pub anomaly_categories: BTreeSet<AnomalyCategory>,
}

pub fn daily_summaries(samples: &[MetricSample]) -> Vec<DailySummary> {
    let mut days: BTreeMap<(&str, NaiveDate), (DailySummary, u32)> = BTreeMap::new();
    for s in samples {
        let (day, hours) = days.entry((s.location.as_str(), s.date())).or_insert_with(|| {
            (
                DailySummary {
                    location: s.location.clone(),
                    date: s.date(),
                    transactions: 0,
                    average_transaction_time: 0.0,
                    error_count: 0,
                    cost: 0.0,
                    anomaly_categories: BTreeSet::new(),
                },
                0,
            )
        });
        day.transactions += u64::from(s.transactions);
        day.average_transaction_time += s.average_transaction_time;
        day.error_count += u64::from(s.error_count);
        day.cost += s.cost;
        day.anomaly_categories.extend(s.anomaly_categories.iter().copied());
        *hours += 1;
    }

    days.into_values()
        .map(|(mut day, hours)| {
            day.average_transaction_time = round_to(day.average_transaction_time / f64::from(hours.max(1)), 2);
            day.cost = round_to(day.cost, 4);
            day
        })
        .collect()
}
