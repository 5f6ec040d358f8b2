//! finops-datagen -- synthetic FinOps demo data for retail cloud workloads.
//!
//! Generates a calendar year of hourly metrics per store location, driven by
//! holiday/weekend seasonality and a scripted anomaly schedule, along with
//! the incident and problem records those anomalies raise, and writes the
//! result to SQLite.

pub mod calendar;
pub mod config;
pub mod domain;
pub mod generate;
pub mod lifecycle;
pub mod schedule;
pub mod storage;
pub mod synth;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::Domain;
use crate::generate::{Generator, YearDataset};
use crate::storage::{PersistReport, RetryPolicy, SqliteSink};

/// Per-location totals for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub location: String,
    pub resource_id: String,
    pub samples: usize,
    pub transactions: u64,
    pub cost: f64,
    pub incidents: usize,
    pub problems: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub year: i32,
    pub domain: Domain,
    pub seed: u64,
    pub locations: Vec<LocationReport>,
    /// Absent on dry runs.
    pub persisted: Option<PersistReport>,
    pub database: Option<PathBuf>,
}

impl RunReport {
    fn new(dataset: &YearDataset) -> Self {
        let locations = dataset
            .locations
            .iter()
            .map(|l| LocationReport {
                location: l.location.clone(),
                resource_id: l.resource.resource_id.clone(),
                samples: l.samples.len(),
                transactions: l.samples.iter().map(|s| u64::from(s.transactions)).sum(),
                cost: synth::round_to(l.samples.iter().map(|s| s.cost).sum(), 2),
                incidents: l.incidents.len(),
                problems: l.problems.len(),
            })
            .collect();
        Self {
            year: dataset.year,
            domain: dataset.domain,
            seed: dataset.seed,
            locations,
            persisted: None,
            database: None,
        }
    }
}

/// Generate one year per `config` and, unless `dry_run`, persist it.
///
/// Generation and SQLite writes are CPU and disk bound, so the whole job runs
/// on the blocking pool.
pub async fn run(config: AppConfig, dry_run: bool) -> Result<RunReport> {
    let generator_config = config.generator_config()?;
    let generator = Generator::new(generator_config)?;
    tracing::info!(
        year = generator.config().year,
        domain = %generator.config().domain,
        locations = generator.config().locations.len(),
        anomaly_cells = generator.schedule().len(),
        "Starting generation"
    );

    tokio::task::spawn_blocking(move || -> Result<RunReport> {
        let dataset = generator.generate_year();
        let mut report = RunReport::new(&dataset);
        if dry_run {
            tracing::info!("Dry run, nothing written");
            return Ok(report);
        }

        let db_path = config.storage.database.clone();
        tracing::info!(db_path = %db_path.display(), "Initializing database");
        let pool = storage::open_pool(&db_path)?;
        let mut sink = SqliteSink::new(pool);
        if config.storage.reset {
            tracing::warn!(db_path = %db_path.display(), "Clearing existing data");
            sink.clear()?;
        }

        let policy = RetryPolicy::from(&config.storage.retry);
        let persisted = storage::persist_dataset(&mut sink, &dataset, &policy)
            .with_context(|| format!("failed to persist to {}", db_path.display()))?;
        report.persisted = Some(persisted);
        report.database = Some(db_path);
        Ok(report)
    })
    .await
    .context("generation task panicked")?
}
