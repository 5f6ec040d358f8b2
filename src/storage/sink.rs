//! Persistence sink contract and its SQLite implementation.
//!
//! Every `insert_*` call writes one batch inside a single transaction, so a
//! failed batch leaves nothing behind and can be retried as a whole.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, ErrorCode, Transaction};
use serde::Serialize;
use thiserror::Error;

use super::{schema, Pool};
use crate::domain::AnomalyCategory;
use crate::lifecycle::{IncidentMetrics, IncidentRecord, ProblemRecord};
use crate::synth::resource::{Application, Resource};
use crate::synth::MetricSample;

/// Timestamp layout used for every TEXT time column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The record families the sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Application,
    Resource,
    MetricSample,
    Incident,
    Problem,
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Application => "applications",
            RecordKind::Resource => "cloud_resources",
            RecordKind::MetricSample => "metric_samples",
            RecordKind::Incident => "incidents",
            RecordKind::Problem => "problems",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Application => "application",
            RecordKind::Resource => "resource",
            RecordKind::MetricSample => "metric sample",
            RecordKind::Incident => "incident",
            RecordKind::Problem => "problem",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    /// The store is momentarily unavailable; the batch may be retried.
    #[error("store busy: {0}")]
    Transient(String),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{kind} batch for {locations} ({from}..={to}) failed after {attempts} attempt(s): {source}")]
    BatchFailed {
        kind: RecordKind,
        locations: String,
        from: NaiveDate,
        to: NaiveDate,
        attempts: u32,
        #[source]
        source: Box<SinkError>,
    },
}

impl SinkError {
    /// Whether retrying the same batch could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_) | SinkError::Pool(_))
    }
}

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                SinkError::Transient(err.to_string())
            }
            _ => SinkError::Sqlite(err),
        }
    }
}

/// Destination for generated records.
///
/// Implementations must be all-or-nothing per call.
pub trait Sink {
    fn insert_application(&mut self, application: &Application) -> Result<(), SinkError>;
    fn insert_resources(&mut self, resources: &[Resource]) -> Result<(), SinkError>;
    fn insert_metric_samples(&mut self, samples: &[MetricSample]) -> Result<(), SinkError>;
    fn insert_incidents(&mut self, incidents: &[IncidentRecord]) -> Result<(), SinkError>;
    fn insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<(), SinkError>;
}

fn ts(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| conversion(idx, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion(idx, e))
}

/// Sink backed by the pooled SQLite database.
#[derive(Clone)]
pub struct SqliteSink {
    pool: Pool,
}

impl SqliteSink {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn in_transaction<F>(&self, write: F) -> Result<(), SinkError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<(), SinkError>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        write(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete every generated row, keeping the schema.
    pub fn clear(&self) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            for table in schema::TABLES {
                tx.execute(&format!("DELETE FROM {}", table), [])?;
            }
            Ok(())
        })
    }

    pub fn count(&self, kind: RecordKind) -> Result<u64, SinkError> {
        let conn = self.pool.get()?;
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Samples for one resource in timestamp order.
    pub fn load_metric_samples(&self, resource_id: &str) -> Result<Vec<MetricSample>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT resource_id, location, timestamp, transactions, average_transaction_time,
                    error_count, cost, cpu_utilization, memory_utilization, anomaly_categories
             FROM metric_samples WHERE resource_id = ?1 ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map(params![resource_id], |row| {
            let timestamp: String = row.get(2)?;
            let categories: String = row.get(9)?;
            Ok(MetricSample {
                resource_id: row.get(0)?,
                location: row.get(1)?,
                timestamp: parse_ts(2, &timestamp)?,
                transactions: row.get(3)?,
                average_transaction_time: row.get(4)?,
                error_count: row.get(5)?,
                cost: row.get(6)?,
                cpu_utilization: row.get(7)?,
                memory_utilization: row.get(8)?,
                anomaly_categories: parse_json::<BTreeSet<AnomalyCategory>>(9, &categories)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Incidents for one location ordered by start time.
    pub fn load_incidents(&self, location: &str) -> Result<Vec<IncidentRecord>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT incident_id, app_id, resource_id, location, category, priority, impact,
                    start_time, resolution_time, close_time, duration_minutes, affected_resources,
                    estimated_cost_impact, description, state_history, time_to_resolve_minutes,
                    time_to_close_minutes
             FROM incidents WHERE location = ?1 ORDER BY start_time, id",
        )?;
        let rows = stmt.query_map(params![location], |row| {
            let category: String = row.get(4)?;
            let impact: String = row.get(6)?;
            let start: String = row.get(7)?;
            let resolved: Option<String> = row.get(8)?;
            let closed: String = row.get(9)?;
            let affected: String = row.get(11)?;
            let history: String = row.get(14)?;
            Ok(IncidentRecord {
                incident_id: row.get(0)?,
                app_id: row.get(1)?,
                resource_id: row.get(2)?,
                location: row.get(3)?,
                category: category.parse().map_err(|e: String| conversion(4, e))?,
                priority: row.get(5)?,
                impact: impact.parse().map_err(|e: String| conversion(6, e))?,
                start_time: parse_ts(7, &start)?,
                resolution_time: resolved.as_deref().map(|r| parse_ts(8, r)).transpose()?,
                close_time: parse_ts(9, &closed)?,
                duration_minutes: row.get(10)?,
                affected_resources: parse_json(11, &affected)?,
                estimated_cost_impact: row.get(12)?,
                description: row.get(13)?,
                state_history: parse_json(14, &history)?,
                metrics: IncidentMetrics {
                    time_to_resolve_minutes: row.get(15)?,
                    time_to_close_minutes: row.get(16)?,
                },
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn load_problems(&self, location: &str) -> Result<Vec<ProblemRecord>, SinkError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT problem_id, app_id, location, category, priority, impact, open_date,
                    resolution_date, related_incident_ids, estimated_cost_impact, description
             FROM problems WHERE location = ?1 ORDER BY open_date, id",
        )?;
        let rows = stmt.query_map(params![location], |row| {
            let category: String = row.get(3)?;
            let impact: String = row.get(5)?;
            let open: String = row.get(6)?;
            let resolved: String = row.get(7)?;
            let related: String = row.get(8)?;
            Ok(ProblemRecord {
                problem_id: row.get(0)?,
                app_id: row.get(1)?,
                location: row.get(2)?,
                category: category.parse().map_err(|e: String| conversion(3, e))?,
                priority: row.get(4)?,
                impact: impact.parse().map_err(|e: String| conversion(5, e))?,
                open_date: parse_ts(6, &open)?,
                resolution_date: parse_ts(7, &resolved)?,
                related_incident_ids: parse_json(8, &related)?,
                estimated_cost_impact: row.get(9)?,
                description: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Sink for SqliteSink {
    fn insert_application(&mut self, app: &Application) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            tx.execute(
                "INSERT INTO applications (app_id, name, description, criticality, business_unit,
                     business_service, owner, creation_date, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    app.app_id,
                    app.name,
                    app.description,
                    app.criticality,
                    app.business_unit,
                    app.business_service,
                    app.owner,
                    ts(app.creation_date),
                    ts(app.last_modified),
                ],
            )?;
            Ok(())
        })
    }

    fn insert_resources(&mut self, resources: &[Resource]) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO cloud_resources (resource_id, app_id, location, resource_type, provider,
                     region, environment, specifications_json, creation_date, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for r in resources {
                stmt.execute(params![
                    r.resource_id,
                    r.app_id,
                    r.location,
                    r.resource_type,
                    r.provider,
                    r.region,
                    r.environment,
                    serde_json::to_string(&r.specifications)?,
                    ts(r.creation_date),
                    ts(r.last_modified),
                ])?;
            }
            Ok(())
        })
    }

    fn insert_metric_samples(&mut self, samples: &[MetricSample]) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO metric_samples (resource_id, location, timestamp, transactions,
                     average_transaction_time, error_count, cost, cpu_utilization,
                     memory_utilization, anomaly_categories)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for s in samples {
                stmt.execute(params![
                    s.resource_id,
                    s.location,
                    ts(s.timestamp),
                    s.transactions,
                    s.average_transaction_time,
                    s.error_count,
                    s.cost,
                    s.cpu_utilization,
                    s.memory_utilization,
                    serde_json::to_string(&s.anomaly_categories)?,
                ])?;
            }
            Ok(())
        })
    }

    fn insert_incidents(&mut self, incidents: &[IncidentRecord]) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO incidents (incident_id, app_id, resource_id, location, category,
                     priority, impact, start_time, resolution_time, close_time, duration_minutes,
                     affected_resources, estimated_cost_impact, description, state_history,
                     time_to_resolve_minutes, time_to_close_minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;
            for i in incidents {
                stmt.execute(params![
                    i.incident_id,
                    i.app_id,
                    i.resource_id,
                    i.location,
                    i.category.name(),
                    i.priority,
                    i.impact.as_str(),
                    ts(i.start_time),
                    i.resolution_time.map(ts),
                    ts(i.close_time),
                    i.duration_minutes,
                    serde_json::to_string(&i.affected_resources)?,
                    i.estimated_cost_impact,
                    i.description,
                    serde_json::to_string(&i.state_history)?,
                    i.metrics.time_to_resolve_minutes,
                    i.metrics.time_to_close_minutes,
                ])?;
            }
            Ok(())
        })
    }

    fn insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<(), SinkError> {
        self.in_transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO problems (problem_id, app_id, location, category, priority, impact,
                     open_date, resolution_date, related_incident_ids, estimated_cost_impact,
                     description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for p in problems {
                stmt.execute(params![
                    p.problem_id,
                    p.app_id,
                    p.location,
                    p.category.name(),
                    p.priority,
                    p.impact.as_str(),
                    ts(p.open_date),
                    ts(p.resolution_date),
                    serde_json::to_string(&p.related_incident_ids)?,
                    p.estimated_cost_impact,
                    p.description,
                ])?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_memory_pool;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample(hour: u32, categories: &[AnomalyCategory]) -> MetricSample {
        MetricSample {
            resource_id: "res-austin".into(),
            location: "Austin".into(),
            timestamp: at(4, hour),
            transactions: 42,
            average_transaction_time: 31.5,
            error_count: 2,
            cost: 0.42,
            cpu_utilization: 55.5,
            memory_utilization: 61.25,
            anomaly_categories: categories.iter().copied().collect(),
        }
    }

    #[test]
    fn test_metric_samples_read_back_in_order() {
        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        let batch = vec![
            sample(1, &[]),
            sample(0, &[AnomalyCategory::HardwareFailure]),
        ];
        sink.insert_metric_samples(&batch).unwrap();

        let loaded = sink.load_metric_samples("res-austin").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], batch[1]);
        assert_eq!(loaded[1], batch[0]);
        assert_eq!(sink.count(RecordKind::MetricSample).unwrap(), 2);
    }

    #[test]
    fn test_views_project_metric_columns() {
        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        sink.insert_metric_samples(&[sample(3, &[])]).unwrap();

        let conn = sink.pool().get().unwrap();
        let cost: f64 = conn
            .query_row("SELECT cost FROM cost_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(cost, 0.42);
        let (cpu, mem): (f64, f64) = conn
            .query_row(
                "SELECT cpu_utilization, memory_utilization FROM resource_utilization",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((cpu, mem), (55.5, 61.25));
    }

    #[test]
    fn test_clear_empties_every_table() {
        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        sink.insert_metric_samples(&[sample(0, &[])]).unwrap();
        sink.clear().unwrap();
        assert_eq!(sink.count(RecordKind::MetricSample).unwrap(), 0);
    }

    #[test]
    fn test_failed_batch_writes_nothing() {
        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        {
            let conn = sink.pool().get().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_zero BEFORE INSERT ON metric_samples
                 WHEN NEW.transactions = 0
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        }
        let mut bad = sample(2, &[]);
        bad.transactions = 0;

        let err = sink
            .insert_metric_samples(&[sample(1, &[]), bad])
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(sink.count(RecordKind::MetricSample).unwrap(), 0);
    }

    #[test]
    fn test_clamped_lifecycle_round_trips() {
        use crate::domain::Domain;
        use crate::lifecycle::LifecycleBuilder;
        use crate::synth::resource::build_resource;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let day = NaiveDate::from_ymd_opt(2024, 2, 8).unwrap();
        let now = day.and_hms_nano_opt(13, 30, 0, 123_456_789).unwrap();
        let builder = LifecycleBuilder::new(Domain::Ecommerce, now);
        let mut rng = StdRng::seed_from_u64(5);
        let resource = build_resource(&mut rng, Domain::Ecommerce, "Austin", 2024, now);

        let mut incidents: Vec<_> = (0..40)
            .map(|_| builder.incident(&mut rng, day, 10, AnomalyCategory::WebsiteOutage, &resource))
            .collect();
        incidents.sort_by_key(|i| i.start_time);
        let truncated = day.and_hms_opt(13, 30, 0).unwrap();
        assert!(incidents.iter().any(|i| i.resolution_time == Some(truncated)));

        let ids = incidents.iter().map(|i| i.incident_id.clone()).collect();
        let problem = builder.problem(&mut rng, day, AnomalyCategory::WebsiteOutage, "Austin", ids);

        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        sink.insert_incidents(&incidents).unwrap();
        sink.insert_problems(std::slice::from_ref(&problem)).unwrap();

        assert_eq!(sink.load_incidents("Austin").unwrap(), incidents);
        assert_eq!(sink.load_problems("Austin").unwrap(), vec![problem]);
    }

    #[test]
    fn test_busy_errors_are_transient() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(SinkError::from(busy).is_transient());

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(!SinkError::from(constraint).is_transient());
    }
}
