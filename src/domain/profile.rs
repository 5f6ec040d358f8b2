//! Numeric baselines for each domain.

use std::ops::{Range, RangeInclusive};

/// A calendar window with its own demand multiplier.
#[derive(Debug, Clone)]
pub struct SeasonalWindow {
    pub month: u32,
    pub days: RangeInclusive<u32>,
    pub factor: f64,
}

/// Transaction volume, latency and error baselines.
#[derive(Debug, Clone)]
pub struct ActivityProfile {
    pub base_transactions: f64,
    pub peak_hour: f64,
    /// Friday multiplier (the `Normal` weekly tier).
    pub friday: f64,
    pub weekend: f64,
    pub holiday: f64,
    pub transactions_rel_sd: f64,
    /// Average transaction time in seconds.
    pub base_transaction_time: f64,
    pub min_transaction_time: f64,
    pub weekend_peak_latency: f64,
    pub holiday_latency: f64,
    pub latency_rel_sd: f64,
    /// Rate parameter of the exponential error-count distribution.
    pub error_rate: f64,
    pub seasonal: &'static [SeasonalWindow],
    /// When set, seasonal windows only lift the peak hours.
    pub seasonal_peak_only: bool,
}

#[derive(Debug, Clone)]
pub struct CostProfile {
    pub base: f64,
    pub peak_hour: f64,
    pub weekend: f64,
    pub holiday: f64,
    /// Relative half-width of the uniform band around the base.
    pub spread: f64,
}

/// Clamped uniform band `[max(floor, b - spread), min(ceiling, b + spread)]`.
#[derive(Debug, Clone)]
pub struct Band {
    pub spread: f64,
    pub floor: f64,
    pub ceiling: f64,
}

#[derive(Debug, Clone)]
pub struct UtilizationProfile {
    pub base: f64,
    pub peak_hour_add: f64,
    pub weekend_add: f64,
    pub holiday_add: f64,
    pub cpu: Band,
    pub memory: Band,
}

/// Everything the engine needs to know about one domain.
#[derive(Debug, Clone)]
pub struct DomainProfile {
    pub application_name: &'static str,
    pub application_description: &'static str,
    pub business_unit: &'static str,
    pub business_service: &'static str,
    pub owner: &'static str,
    pub resource_type: &'static str,
    /// Hours (half-open) considered peak trading time.
    pub peak_hours: Range<u32>,
    pub activity: ActivityProfile,
    pub cost: CostProfile,
    pub utilization: UtilizationProfile,
    pub incident_cost_impact: (f64, f64),
    pub problem_cost_impact: (f64, f64),
}

impl DomainProfile {
    /// `retailpos-app-01` style identifier derived from the application name.
    pub fn app_id(&self) -> String {
        format!("{}-app-01", self.application_name.to_lowercase().replace(' ', "_"))
    }

    pub fn is_peak_hour(&self, hour: u32) -> bool {
        self.peak_hours.contains(&hour)
    }
}

const POS_SEASONS: &[SeasonalWindow] = &[
    SeasonalWindow { month: 11, days: 1..=30, factor: 1.4 },
    SeasonalWindow { month: 12, days: 1..=31, factor: 1.4 },
    SeasonalWindow { month: 6, days: 1..=30, factor: 0.8 },
    SeasonalWindow { month: 7, days: 1..=31, factor: 0.8 },
    SeasonalWindow { month: 8, days: 1..=31, factor: 0.8 },
];

const ECOMMERCE_SEASONS: &[SeasonalWindow] = &[
    // pre-holiday shopping
    SeasonalWindow { month: 11, days: 16..=30, factor: 1.5 },
    SeasonalWindow { month: 12, days: 1..=25, factor: 1.7 },
    // post-holiday sales
    SeasonalWindow { month: 1, days: 1..=31, factor: 1.3 },
];

pub static POS: DomainProfile = DomainProfile {
    application_name: "RetailPOS",
    application_description: "Point of Sale application for Texas retail locations",
    business_unit: "Retail Operations",
    business_service: "Retail Transaction Processing",
    owner: "IT Retail Team",
    resource_type: "POS Terminal",
    peak_hours: 10..20,
    activity: ActivityProfile {
        base_transactions: 5.0,
        peak_hour: 1.1,
        friday: 1.2,
        weekend: 1.6,
        holiday: 2.5,
        transactions_rel_sd: 0.3,
        base_transaction_time: 30.0,
        min_transaction_time: 10.0,
        weekend_peak_latency: 1.1,
        holiday_latency: 1.2,
        latency_rel_sd: 0.2,
        error_rate: 0.05,
        seasonal: POS_SEASONS,
        seasonal_peak_only: true,
    },
    cost: CostProfile {
        base: 0.01,
        peak_hour: 1.5,
        weekend: 1.2,
        holiday: 1.0,
        spread: 0.2,
    },
    utilization: UtilizationProfile {
        base: 0.2,
        peak_hour_add: 0.3,
        weekend_add: 0.15,
        holiday_add: 0.0,
        cpu: Band { spread: 0.2, floor: 0.05, ceiling: 0.95 },
        memory: Band { spread: 0.15, floor: 0.1, ceiling: 0.9 },
    },
    incident_cost_impact: (20.0, 200.0),
    problem_cost_impact: (50.0, 500.0),
};

pub static ECOMMERCE: DomainProfile = DomainProfile {
    application_name: "ECommercePlatform",
    application_description: "E-commerce platform for Texas retail businesses",
    business_unit: "Online Sales",
    business_service: "Online Sales Processing",
    owner: "Digital Commerce Team",
    resource_type: "E-commerce Website",
    peak_hours: 10..22,
    activity: ActivityProfile {
        base_transactions: 6.0,
        peak_hour: 1.3,
        friday: 1.2,
        weekend: 1.8,
        holiday: 2.5,
        transactions_rel_sd: 0.25,
        base_transaction_time: 8.0,
        min_transaction_time: 2.0,
        weekend_peak_latency: 1.1,
        holiday_latency: 1.2,
        latency_rel_sd: 0.2,
        error_rate: 0.2,
        seasonal: ECOMMERCE_SEASONS,
        seasonal_peak_only: false,
    },
    cost: CostProfile {
        base: 0.02,
        peak_hour: 1.3,
        weekend: 1.1,
        holiday: 1.5,
        spread: 0.1,
    },
    utilization: UtilizationProfile {
        base: 0.1,
        peak_hour_add: 0.2,
        weekend_add: 0.1,
        holiday_add: 0.3,
        cpu: Band { spread: 0.15, floor: 0.05, ceiling: 0.95 },
        memory: Band { spread: 0.1, floor: 0.1, ceiling: 0.9 },
    },
    incident_cost_impact: (50.0, 500.0),
    problem_cost_impact: (100.0, 1000.0),
};

impl ActivityProfile {
    pub fn seasonal_factor(&self, month: u32, day: u32) -> f64 {
        self.seasonal
            .iter()
            .find(|w| w.month == month && w.days.contains(&day))
            .map_or(1.0, |w| w.factor)
    }
}
