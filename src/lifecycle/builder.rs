use chrono::{Duration, NaiveDate, NaiveDateTime, SubsecRound};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{
    HoldReason, Impact, IncidentMetrics, IncidentRecord, IncidentState, ProblemRecord,
    StateTransition,
};
use crate::domain::narrative;
use crate::domain::{AnomalyCategory, Domain, DomainProfile};
use crate::synth::resource::Resource;
use crate::synth::round_to;

pub const ON_HOLD_PROBABILITY: f64 = 0.2;
pub const CANCEL_PROBABILITY: f64 = 0.05;

/// `PREFIX-<uuid v4>`, with the uuid bytes drawn from `rng` so seeded runs
/// reproduce their identifiers.
pub(crate) fn record_id<R: Rng>(rng: &mut R, prefix: &str) -> String {
    let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    format!("{}-{}", prefix, uuid)
}

fn minutes<R: Rng>(rng: &mut R, lo: i64, hi: i64) -> Duration {
    Duration::minutes(rng.gen_range(lo..=hi))
}

fn elapsed_minutes(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    round_to((to - from).num_seconds() as f64 / 60.0, 2)
}

/// Synthesizes incident and problem records for anomaly occurrences.
///
/// `now` is the generation-time reference: no incident claims a resolution
/// after it.
#[derive(Debug, Clone)]
pub struct LifecycleBuilder {
    profile: &'static DomainProfile,
    now: NaiveDateTime,
}

impl LifecycleBuilder {
    pub fn new(domain: Domain, now: NaiveDateTime) -> Self {
        Self { profile: domain.profile(), now: now.trunc_subsecs(0) }
    }

    pub fn incident<R: Rng>(
        &self,
        rng: &mut R,
        date: NaiveDate,
        hour: u32,
        category: AnomalyCategory,
        resource: &Resource,
    ) -> IncidentRecord {
        let start = date
            .and_hms_opt(hour, rng.gen_range(0..=59), rng.gen_range(0..=59))
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        let in_progress = start + minutes(rng, 5, 15);

        let mut history = vec![
            StateTransition { state: IncidentState::New, timestamp: start, reason: None },
            StateTransition { state: IncidentState::InProgress, timestamp: in_progress, reason: None },
        ];

        let (resolution_time, close_time, duration_minutes) = if rng.gen_bool(CANCEL_PROBABILITY) {
            let canceled_at = start + minutes(rng, 30, 120);
            history.push(StateTransition {
                state: IncidentState::Canceled,
                timestamp: canceled_at,
                reason: None,
            });
            (None, canceled_at, (canceled_at - start).num_minutes())
        } else {
            let mut effort = minutes(rng, 60, 360);
            if category.can_go_on_hold() && rng.gen_bool(ON_HOLD_PROBABILITY) {
                let on_hold = in_progress + minutes(rng, 30, 90);
                let reason = HoldReason::ALL.choose(rng).copied();
                let resumed = on_hold + minutes(rng, 5, 15);
                history.push(StateTransition { state: IncidentState::OnHold, timestamp: on_hold, reason });
                history.push(StateTransition {
                    state: IncidentState::InProgress,
                    timestamp: resumed,
                    reason: None,
                });
                // hold time plus post-hold work
                effort = effort + minutes(rng, 60, 240) + minutes(rng, 30, 60);
            }

            let resolved = (start + effort).min(self.now);
            debug_assert!(
                history.last().map_or(true, |t| t.timestamp <= resolved),
                "incident resolved at {} before its last transition",
                resolved
            );
            let closed = resolved + Duration::days(rng.gen_range(1..=3));
            history.push(StateTransition { state: IncidentState::Resolved, timestamp: resolved, reason: None });
            history.push(StateTransition { state: IncidentState::Closed, timestamp: closed, reason: None });
            (Some(resolved), closed, (resolved - start).num_minutes())
        };

        let (lo, hi) = self.profile.incident_cost_impact;
        IncidentRecord {
            incident_id: record_id(rng, "INC"),
            app_id: resource.app_id.clone(),
            resource_id: resource.resource_id.clone(),
            location: resource.location.clone(),
            category,
            priority: rng.gen_range(1..=3),
            impact: *[Impact::High, Impact::Medium, Impact::Low].choose(rng).unwrap_or(&Impact::Medium),
            start_time: start,
            resolution_time,
            close_time,
            duration_minutes,
            affected_resources: vec![resource.resource_id.clone()],
            estimated_cost_impact: round_to(rng.gen_range(lo..=hi), 2),
            description: narrative::incident_description(
                category,
                self.profile.application_name,
                &resource.location,
                &resource.resource_id,
                start,
            ),
            metrics: IncidentMetrics {
                time_to_resolve_minutes: resolution_time.map(|r| elapsed_minutes(start, r)),
                time_to_close_minutes: elapsed_minutes(start, close_time),
            },
            state_history: history,
        }
    }

    /// Open a problem for a systemic anomaly on `date`.
    pub fn problem<R: Rng>(
        &self,
        rng: &mut R,
        date: NaiveDate,
        category: AnomalyCategory,
        location: &str,
        related_incident_ids: Vec<String>,
    ) -> ProblemRecord {
        let opened_on = date - Duration::days(rng.gen_range(1..=7));
        let open_date = opened_on
            .and_hms_opt(rng.gen_range(9..=17), rng.gen_range(0..=59), 0)
            .unwrap_or_else(|| opened_on.and_time(chrono::NaiveTime::MIN));
        let resolution_date = self.now + Duration::days(rng.gen_range(1..=5));
        let (lo, hi) = self.profile.problem_cost_impact;

        ProblemRecord {
            problem_id: record_id(rng, "PRB"),
            app_id: self.profile.app_id(),
            location: location.to_string(),
            category,
            priority: rng.gen_range(1..=2),
            impact: if rng.gen_bool(0.5) { Impact::High } else { Impact::Medium },
            open_date,
            resolution_date,
            related_incident_ids,
            estimated_cost_impact: round_to(rng.gen_range(lo..=hi), 2),
            description: narrative::problem_description(
                category,
                self.profile.application_name,
                location,
                open_date,
            ),
        }
    }
}
