//! Default anomaly scripts for both domains.

use chrono::NaiveDate;

use super::AnomalyEvent;
use crate::domain::{AnomalyCategory, AnomalyCategory::*, Domain};

/// (date, location, category, hour, hour range)
type Entry = (&'static str, &'static str, AnomalyCategory, Option<u32>, Option<(u32, u32)>);

const POS_EVENTS: &[Entry] = &[
    ("2024-01-01", "Austin", NetworkConnectivityLoss, None, Some((10, 13))),
    ("2024-01-20", "Corpus Christi", SystemMalfunction, Some(14), None),
    ("2024-02-20", "Austin", SystemMalfunction, None, None),
    ("2024-02-22", "Houston", HardwareFailure, Some(12), None),
    ("2024-02-22", "Houston", EmployeeInefficiency, None, None),
    ("2024-02-25", "The Woodlands", HardwareFailure, Some(10), None),
    ("2024-02-28", "Austin", NetworkConnectivityLoss, None, Some((11, 12))),
    ("2024-03-01", "Plano", SystemMalfunction, None, None),
    ("2024-03-04", "Houston", EmployeeInefficiency, None, None),
    ("2024-03-21", "Austin", SystemMalfunction, None, None),
    ("2024-04-01", "Houston", EmployeeInefficiency, None, None),
    ("2024-04-11", "Plano", EmployeeInefficiency, None, None),
    ("2024-04-15", "Austin", SystemMalfunction, None, None),
    ("2024-05-05", "Plano", UnauthorizedShutdown, None, None),
    ("2024-05-15", "Plano", UnauthorizedShutdown, None, None),
    ("2024-05-27", "Dallas-Fort Worth", PeakEventImpact, None, None), // Memorial Day
    ("2024-06-16", "Dallas-Fort Worth", PeakEventImpact, None, None), // Father's Day
    ("2024-07-15", "Houston", EmployeeInefficiency, None, None),
    ("2024-07-16", "Houston", EmployeeInefficiency, None, None),
    ("2024-07-17", "Houston", EmployeeInefficiency, None, None),
    ("2024-10-26", "San Antonio", SignificantTechnicalProblem, None, None),
    ("2024-11-28", "Dallas-Fort Worth", PeakEventImpact, Some(10), None),
    ("2025-01-26", "Corpus Christi", SystemMalfunction, Some(10), None),
    ("2025-03-01", "Austin", NetworkConnectivityLoss, None, Some((13, 16))),
    ("2025-04-10", "Plano", EmployeeInefficiency, None, None),
    ("2025-04-12", "Plano", EmployeeInefficiency, None, None),
    ("2025-05-20", "The Woodlands", HardwareFailure, Some(10), None),
    ("2025-07-10", "McKinney", SignificantTechnicalProblem, Some(15), None),
    ("2025-09-05", "Denton", UnauthorizedShutdown, Some(11), None),
    ("2025-10-01", "San Antonio", SoftwareUpdateIssue, None, Some((9, 13))),
    ("2025-11-27", "Dallas-Fort Worth", PeakEventImpact, Some(10), None),
    ("2025-12-24", "Houston", PeakEventImpact, Some(12), None),
];

const ECOMMERCE_EVENTS: &[Entry] = &[
    ("2024-01-20", "Houston", DdosAttack, None, Some((12, 20))),
    ("2024-02-08", "San Antonio", WebsiteOutage, None, None),
    ("2024-02-22", "Houston", WebsiteOutage, None, None),
    ("2024-03-10", "Dallas-Fort Worth", DdosAttack, None, Some((10, 14))),
    ("2024-03-25", "San Antonio", PaymentProcessingIssues, None, None),
    ("2024-04-15", "Austin", WebsiteOutage, None, None),
    ("2024-04-16", "Houston", WebsiteOutage, None, None),
    ("2024-07-20", "Dallas-Fort Worth", UnexpectedTrafficSurge, None, None),
    ("2024-11-05", "Houston", PaymentProcessingIssues, None, None),
    ("2024-11-06", "Houston", PaymentProcessingIssues, None, None),
    ("2024-11-07", "Austin", PaymentProcessingIssues, None, None),
    ("2025-02-05", "Houston", WebsiteOutage, None, None),
    ("2025-02-07", "Houston", WebsiteOutage, None, None),
    ("2025-03-20", "San Antonio", PaymentProcessingIssues, None, None),
    ("2025-03-21", "San Antonio", PaymentProcessingIssues, None, None),
    ("2025-03-22", "San Antonio", PaymentProcessingIssues, None, None),
    ("2025-06-10", "Dallas-Fort Worth", DdosAttack, None, Some((10, 14))),
    ("2025-08-10", "Frisco", UnexpectedTrafficSurge, None, None),
    ("2025-09-15", "Plano", ThirdPartyApiFailure, None, None),
    ("2025-09-16", "Plano", ThirdPartyApiFailure, None, None),
    ("2025-10-20", "Austin", FlashSaleGoneWrong, None, Some((9, 11))),
];

/// Default locations, used when the configuration names none.
pub const LOCATIONS: &[&str] = &[
    "Austin",
    "Dallas-Fort Worth",
    "Houston",
    "San Antonio",
    "Frisco",
    "Plano",
    "McKinney",
    "The Woodlands",
    "Denton",
    "Corpus Christi",
];

fn expand(entries: &[Entry]) -> Vec<AnomalyEvent> {
    entries
        .iter()
        .filter_map(|&(date, location, category, hour, range)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            let mut event = AnomalyEvent::new(date, location, category);
            if let Some(h) = hour {
                event = event.at_hour(h);
            }
            if let Some((start, end)) = range {
                event = event.between(start, end);
            }
            Some(event)
        })
        .collect()
}

/// The built-in anomaly script for `domain`, all years.
pub fn events(domain: Domain) -> Vec<AnomalyEvent> {
    match domain {
        Domain::Pos => expand(POS_EVENTS),
        Domain::Ecommerce => expand(ECOMMERCE_EVENTS),
    }
}
