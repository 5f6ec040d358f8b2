//! Domain variants and the anomaly categories each one knows about.
//!
//! Both the point-of-sale and e-commerce populations run through the same
//! engine. Everything that differs between them is data: the category table
//! here, the numeric [`profile::DomainProfile`], and the text templates in
//! [`narrative`].

pub mod narrative;
pub mod profile;

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;

pub use profile::DomainProfile;

/// Which population is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Pos,
    Ecommerce,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Pos => write!(f, "pos"),
            Domain::Ecommerce => write!(f, "ecommerce"),
        }
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pos" => Ok(Domain::Pos),
            "ecommerce" | "e-commerce" | "ecomm" => Ok(Domain::Ecommerce),
            other => Err(format!("unknown domain '{}' (expected 'pos' or 'ecommerce')", other)),
        }
    }
}

impl Domain {
    pub fn categories(self) -> &'static [AnomalyCategory] {
        use AnomalyCategory::*;
        match self {
            Domain::Pos => &[
                SystemMalfunction,
                PeakEventImpact,
                EmployeeInefficiency,
                SignificantTechnicalProblem,
                UnauthorizedShutdown,
                NetworkConnectivityLoss,
                HardwareFailure,
                SoftwareUpdateIssue,
            ],
            Domain::Ecommerce => &[
                WebsiteOutage,
                UnexpectedTrafficSurge,
                PaymentProcessingIssues,
                DdosAttack,
                ThirdPartyApiFailure,
                FlashSaleGoneWrong,
            ],
        }
    }

    pub fn profile(self) -> &'static DomainProfile {
        match self {
            Domain::Pos => &profile::POS,
            Domain::Ecommerce => &profile::ECOMMERCE,
        }
    }
}

/// Every anomaly category across both domains.
///
/// Serialized with the human-readable names used in schedules and stored
/// records (e.g. `"System Malfunction"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyCategory {
    #[serde(rename = "System Malfunction")]
    SystemMalfunction,
    #[serde(rename = "Peak Event Impact")]
    PeakEventImpact,
    #[serde(rename = "Employee Inefficiency/Device Issue")]
    EmployeeInefficiency,
    #[serde(rename = "Significant Technical Problem")]
    SignificantTechnicalProblem,
    #[serde(rename = "Unauthorized Shutdown")]
    UnauthorizedShutdown,
    #[serde(rename = "Network Connectivity Loss")]
    NetworkConnectivityLoss,
    #[serde(rename = "Hardware Failure")]
    HardwareFailure,
    #[serde(rename = "Software Update Issue")]
    SoftwareUpdateIssue,
    #[serde(rename = "Website Outage")]
    WebsiteOutage,
    #[serde(rename = "Unexpected Traffic Surge")]
    UnexpectedTrafficSurge,
    #[serde(rename = "Payment Processing Issues")]
    PaymentProcessingIssues,
    #[serde(rename = "DDoS Attack")]
    DdosAttack,
    #[serde(rename = "Third-Party API Failure")]
    ThirdPartyApiFailure,
    #[serde(rename = "Flash Sale Gone Wrong")]
    FlashSaleGoneWrong,
}

/// How a category overrides the baseline metrics of an affected hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnomalyEffect {
    /// Transactions forced to zero.
    Outage,
    /// Transactions multiplied, latency optionally inflated.
    Surge { factor: f64, latency_factor: f64 },
    /// Transactions scaled down to a fraction of baseline.
    Throttle { factor: f64 },
    /// Average transaction time inflated by a random 30-70%.
    Degradation,
    /// Error count forced into a high range, transactions scaled down.
    TechnicalFault { volume_factor: f64 },
    /// Transactions, latency and errors all forced to zero.
    Shutdown,
}

impl AnomalyEffect {
    /// Lower runs first. Zeroing effects run last so no later multiplier or
    /// error injection can undo them.
    pub fn precedence(&self) -> u8 {
        match self {
            AnomalyEffect::Surge { .. } => 0,
            AnomalyEffect::Throttle { .. } => 1,
            AnomalyEffect::Degradation => 2,
            AnomalyEffect::TechnicalFault { .. } => 3,
            AnomalyEffect::Outage => 4,
            AnomalyEffect::Shutdown => 5,
        }
    }

    pub fn is_outage(&self) -> bool {
        matches!(self, AnomalyEffect::Outage | AnomalyEffect::Shutdown)
    }
}

/// Which hours of an anomalous day spawn incident records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentSpan {
    /// No incident is raised.
    None,
    /// A single incident at the cell's trigger hour.
    Once,
    /// One incident per hour in the range.
    Hours(Range<u32>),
}

impl AnomalyCategory {
    pub fn name(self) -> &'static str {
        use AnomalyCategory::*;
        match self {
            SystemMalfunction => "System Malfunction",
            PeakEventImpact => "Peak Event Impact",
            EmployeeInefficiency => "Employee Inefficiency/Device Issue",
            SignificantTechnicalProblem => "Significant Technical Problem",
            UnauthorizedShutdown => "Unauthorized Shutdown",
            NetworkConnectivityLoss => "Network Connectivity Loss",
            HardwareFailure => "Hardware Failure",
            SoftwareUpdateIssue => "Software Update Issue",
            WebsiteOutage => "Website Outage",
            UnexpectedTrafficSurge => "Unexpected Traffic Surge",
            PaymentProcessingIssues => "Payment Processing Issues",
            DdosAttack => "DDoS Attack",
            ThirdPartyApiFailure => "Third-Party API Failure",
            FlashSaleGoneWrong => "Flash Sale Gone Wrong",
        }
    }

    pub fn domain(self) -> Domain {
        use AnomalyCategory::*;
        match self {
            SystemMalfunction
            | PeakEventImpact
            | EmployeeInefficiency
            | SignificantTechnicalProblem
            | UnauthorizedShutdown
            | NetworkConnectivityLoss
            | HardwareFailure
            | SoftwareUpdateIssue => Domain::Pos,
            WebsiteOutage
            | UnexpectedTrafficSurge
            | PaymentProcessingIssues
            | DdosAttack
            | ThirdPartyApiFailure
            | FlashSaleGoneWrong => Domain::Ecommerce,
        }
    }

    pub fn effect(self) -> AnomalyEffect {
        use AnomalyCategory::*;
        match self {
            SystemMalfunction | HardwareFailure | WebsiteOutage => AnomalyEffect::Outage,
            PeakEventImpact => AnomalyEffect::Surge { factor: 5.0, latency_factor: 1.3 },
            UnexpectedTrafficSurge => AnomalyEffect::Surge { factor: 4.0, latency_factor: 1.0 },
            PaymentProcessingIssues => AnomalyEffect::Throttle { factor: 0.4 },
            ThirdPartyApiFailure => AnomalyEffect::Throttle { factor: 0.7 },
            EmployeeInefficiency | NetworkConnectivityLoss | SoftwareUpdateIssue => {
                AnomalyEffect::Degradation
            }
            SignificantTechnicalProblem | DdosAttack | FlashSaleGoneWrong => {
                AnomalyEffect::TechnicalFault { volume_factor: 0.2 }
            }
            UnauthorizedShutdown => AnomalyEffect::Shutdown,
        }
    }

    pub fn incident_span(self) -> IncidentSpan {
        use AnomalyCategory::*;
        match self {
            PeakEventImpact | EmployeeInefficiency => IncidentSpan::None,
            WebsiteOutage => IncidentSpan::Hours(0..24),
            PaymentProcessingIssues => IncidentSpan::Hours(8..22),
            _ => IncidentSpan::Once,
        }
    }

    /// Systemic categories also open a problem record.
    pub fn is_systemic(self) -> bool {
        matches!(
            self,
            AnomalyCategory::SignificantTechnicalProblem
                | AnomalyCategory::WebsiteOutage
                | AnomalyCategory::DdosAttack
        )
    }

    /// Categories whose resolution plausibly waits on an outside party.
    pub fn can_go_on_hold(self) -> bool {
        matches!(
            self,
            AnomalyCategory::HardwareFailure
                | AnomalyCategory::NetworkConnectivityLoss
                | AnomalyCategory::ThirdPartyApiFailure
        )
    }
}

impl std::fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnomalyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Domain::Pos, Domain::Ecommerce]
            .iter()
            .flat_map(|d| d.categories().iter().copied())
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown anomaly category '{}'", s))
    }
}
