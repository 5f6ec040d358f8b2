//! Incident and problem records with synthesized lifecycles.
//!
//! An incident's whole history is produced at once by
//! [`builder::LifecycleBuilder`]; records are never updated afterwards.
//!
//! ```text
//! New -> In Progress -> [On Hold -> In Progress] -> Resolved -> Closed
//!                    \-> Canceled
//! ```

pub mod builder;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::AnomalyCategory;

pub use builder::LifecycleBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentState {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "On Hold")]
    OnHold,
    Resolved,
    Canceled,
    Closed,
}

impl IncidentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IncidentState::Closed | IncidentState::Canceled)
    }

    pub fn name(self) -> &'static str {
        match self {
            IncidentState::New => "New",
            IncidentState::InProgress => "In Progress",
            IncidentState::OnHold => "On Hold",
            IncidentState::Resolved => "Resolved",
            IncidentState::Canceled => "Canceled",
            IncidentState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for IncidentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an incident was parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldReason {
    #[serde(rename = "Awaiting Vendor")]
    AwaitingVendor,
    #[serde(rename = "Awaiting Parts Delivery")]
    AwaitingPartsDelivery,
    #[serde(rename = "Awaiting Network Team")]
    AwaitingNetworkTeam,
}

impl HoldReason {
    pub const ALL: [HoldReason; 3] = [
        HoldReason::AwaitingVendor,
        HoldReason::AwaitingPartsDelivery,
        HoldReason::AwaitingNetworkTeam,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

impl std::str::FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Impact::High),
            "medium" => Ok(Impact::Medium),
            "low" => Ok(Impact::Low),
            other => Err(format!("unknown impact '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub state: IncidentState,
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<HoldReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentMetrics {
    /// `None` for canceled incidents.
    pub time_to_resolve_minutes: Option<f64>,
    pub time_to_close_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub incident_id: String,
    pub app_id: String,
    pub resource_id: String,
    pub location: String,
    pub category: AnomalyCategory,
    /// 1 (highest) to 3.
    pub priority: u8,
    pub impact: Impact,
    pub start_time: NaiveDateTime,
    pub resolution_time: Option<NaiveDateTime>,
    pub close_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub affected_resources: Vec<String>,
    pub estimated_cost_impact: f64,
    pub description: String,
    pub state_history: Vec<StateTransition>,
    pub metrics: IncidentMetrics,
}

impl IncidentRecord {
    /// Final state in the history.
    pub fn state(&self) -> IncidentState {
        self.state_history
            .last()
            .map_or(IncidentState::New, |t| t.state)
    }

    pub fn is_canceled(&self) -> bool {
        self.state() == IncidentState::Canceled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub problem_id: String,
    pub app_id: String,
    pub location: String,
    pub category: AnomalyCategory,
    pub priority: u8,
    pub impact: Impact,
    pub open_date: NaiveDateTime,
    pub resolution_date: NaiveDateTime,
    pub related_incident_ids: Vec<String>,
    pub estimated_cost_impact: f64,
    pub description: String,
}
