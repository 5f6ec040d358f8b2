//! Batched hand-off of a generated year to a [`Sink`].
//!
//! Samples go in one batch per day covering every location; resources,
//! incidents and problems go per location. Each batch is retried on
//! transient failures; a batch that still fails aborts the run with a
//! [`SinkError::BatchFailed`] naming what was being written.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::{RecordKind, RetryPolicy, Sink, SinkError};
use crate::calendar::days_of_year;
use crate::generate::YearDataset;

/// Row and batch counts written by [`persist_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub applications: u64,
    pub resources: u64,
    pub metric_samples: u64,
    pub incidents: u64,
    pub problems: u64,
    pub batches: u64,
    /// Extra attempts spent on transient failures.
    pub retries: u64,
}

struct Batch<'a> {
    kind: RecordKind,
    locations: &'a [String],
    from: NaiveDate,
    to: NaiveDate,
}

impl Batch<'_> {
    fn label(&self) -> String {
        format!("{} {}..={}", self.kind, self.from, self.to)
    }

    fn failed(&self, source: SinkError, attempts: u32) -> SinkError {
        SinkError::BatchFailed {
            kind: self.kind,
            locations: self.locations.join(", "),
            from: self.from,
            to: self.to,
            attempts,
            source: Box::new(source),
        }
    }
}

fn write<S, F>(
    sink: &mut S,
    policy: &RetryPolicy,
    batch: Batch<'_>,
    report: &mut PersistReport,
    mut op: F,
) -> Result<(), SinkError>
where
    S: Sink,
    F: FnMut(&mut S) -> Result<(), SinkError>,
{
    let label = batch.label();
    match policy.run(&label, || op(&mut *sink)) {
        Ok(((), attempts)) => {
            report.batches += 1;
            report.retries += u64::from(attempts - 1);
            Ok(())
        }
        Err((e, attempts)) => Err(batch.failed(e, attempts)),
    }
}

/// Write every record of `dataset` to `sink`.
pub fn persist_dataset<S: Sink>(
    sink: &mut S,
    dataset: &YearDataset,
    policy: &RetryPolicy,
) -> Result<PersistReport, SinkError> {
    let mut report = PersistReport::default();
    let names: Vec<String> = dataset.locations.iter().map(|l| l.location.clone()).collect();
    let all: &[String] = &names;
    let first = NaiveDate::from_ymd_opt(dataset.year, 1, 1).unwrap_or(NaiveDate::MIN);
    let last = NaiveDate::from_ymd_opt(dataset.year, 12, 31).unwrap_or(NaiveDate::MAX);

    let whole_year = |kind: RecordKind| Batch {
        kind,
        locations: all,
        from: first,
        to: last,
    };

    write(sink, policy, whole_year(RecordKind::Application), &mut report, |s| {
        s.insert_application(&dataset.application)
    })?;
    report.applications = 1;

    let resources: Vec<_> = dataset.resources().cloned().collect();
    write(sink, policy, whole_year(RecordKind::Resource), &mut report, |s| {
        s.insert_resources(&resources)
    })?;
    report.resources = resources.len() as u64;

    for date in days_of_year(dataset.year) {
        let day: Vec<_> = dataset
            .locations
            .iter()
            .flat_map(|l| l.samples_on(date).iter().cloned())
            .collect();
        if day.is_empty() {
            continue;
        }
        let batch = Batch {
            kind: RecordKind::MetricSample,
            locations: all,
            from: date,
            to: date,
        };
        write(sink, policy, batch, &mut report, |s| s.insert_metric_samples(&day))?;
        report.metric_samples += day.len() as u64;
    }
    info!(samples = report.metric_samples, "Metric samples written");

    for loc in &dataset.locations {
        let here = std::slice::from_ref(&loc.location);

        if let (Some(a), Some(b)) = (loc.incidents.first(), loc.incidents.last()) {
            let batch = Batch {
                kind: RecordKind::Incident,
                locations: here,
                from: a.start_time.date(),
                to: b.start_time.date(),
            };
            write(sink, policy, batch, &mut report, |s| {
                s.insert_incidents(&loc.incidents)
            })?;
            report.incidents += loc.incidents.len() as u64;
        }

        if let (Some(a), Some(b)) = (loc.problems.first(), loc.problems.last()) {
            let batch = Batch {
                kind: RecordKind::Problem,
                locations: here,
                from: a.open_date.date(),
                to: b.open_date.date(),
            };
            write(sink, policy, batch, &mut report, |s| {
                s.insert_problems(&loc.problems)
            })?;
            report.problems += loc.problems.len() as u64;
        }
    }

    info!(
        samples = report.metric_samples,
        incidents = report.incidents,
        problems = report.problems,
        batches = report.batches,
        retries = report.retries,
        "Dataset persisted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::domain::{AnomalyCategory, Domain};
    use crate::generate::generate_year;
    use crate::lifecycle::{IncidentRecord, ProblemRecord};
    use crate::schedule::AnomalyEvent;
    use crate::storage::{open_memory_pool, SqliteSink};
    use crate::synth::resource::{Application, Resource};
    use crate::synth::MetricSample;

    /// Records batch sizes and fails the first `busy` sample batches.
    #[derive(Default)]
    struct FlakySink {
        busy: u32,
        fatal_on_samples: bool,
        sample_batches: Vec<usize>,
        incidents: usize,
        problems: usize,
    }

    impl Sink for FlakySink {
        fn insert_application(&mut self, _: &Application) -> Result<(), SinkError> {
            Ok(())
        }

        fn insert_resources(&mut self, _: &[Resource]) -> Result<(), SinkError> {
            Ok(())
        }

        fn insert_metric_samples(&mut self, samples: &[MetricSample]) -> Result<(), SinkError> {
            if self.fatal_on_samples {
                return Err(SinkError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            if self.busy > 0 {
                self.busy -= 1;
                return Err(SinkError::Transient("database is locked".into()));
            }
            self.sample_batches.push(samples.len());
            Ok(())
        }

        fn insert_incidents(&mut self, incidents: &[IncidentRecord]) -> Result<(), SinkError> {
            self.incidents += incidents.len();
            Ok(())
        }

        fn insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<(), SinkError> {
            self.problems += problems.len();
            Ok(())
        }
    }

    fn dataset() -> YearDataset {
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let config = GeneratorConfig::new(2024, Domain::Ecommerce, vec!["Austin".into(), "Waco".into()])
            .with_anomalies(vec![AnomalyEvent::new(
                date,
                "Austin",
                AnomalyCategory::WebsiteOutage,
            )])
            .with_seed(11);
        generate_year(config).unwrap()
    }

    #[test]
    fn test_one_sample_batch_per_day() {
        let ds = dataset();
        let mut sink = FlakySink::default();
        let report = persist_dataset(&mut sink, &ds, &RetryPolicy::immediate(1)).unwrap();

        assert_eq!(sink.sample_batches.len(), 366);
        assert!(sink.sample_batches.iter().all(|&n| n == 48));
        assert_eq!(report.metric_samples, 366 * 48);
        assert_eq!(report.incidents as usize, sink.incidents);
        assert_eq!(report.problems as usize, sink.problems);
        assert_eq!(sink.problems, 1);
        assert_eq!(report.retries, 0);
    }

    #[test]
    fn test_transient_failures_are_absorbed() {
        let ds = dataset();
        let mut sink = FlakySink {
            busy: 2,
            ..FlakySink::default()
        };
        let report = persist_dataset(&mut sink, &ds, &RetryPolicy::immediate(3)).unwrap();
        assert_eq!(report.retries, 2);
        assert_eq!(sink.sample_batches.len(), 366);
    }

    #[test]
    fn test_exhausted_retries_name_the_batch() {
        let ds = dataset();
        let mut sink = FlakySink {
            busy: 10,
            ..FlakySink::default()
        };
        let err = persist_dataset(&mut sink, &ds, &RetryPolicy::immediate(2)).unwrap_err();
        match err {
            SinkError::BatchFailed {
                kind,
                locations,
                from,
                attempts,
                ..
            } => {
                assert_eq!(kind, RecordKind::MetricSample);
                assert_eq!(locations, "Austin, Waco");
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fatal_errors_fail_fast() {
        let ds = dataset();
        let mut sink = FlakySink {
            fatal_on_samples: true,
            ..FlakySink::default()
        };
        let err = persist_dataset(&mut sink, &ds, &RetryPolicy::immediate(5)).unwrap_err();
        assert!(matches!(err, SinkError::BatchFailed { attempts: 1, .. }));
    }

    #[test]
    fn test_sqlite_round_trip() {
        let ds = dataset();
        let mut sink = SqliteSink::new(open_memory_pool().unwrap());
        let report = persist_dataset(&mut sink, &ds, &RetryPolicy::immediate(1)).unwrap();

        assert_eq!(sink.count(RecordKind::MetricSample).unwrap(), report.metric_samples);
        assert_eq!(sink.count(RecordKind::Resource).unwrap(), 2);

        let austin = ds.get("Austin").unwrap();
        let samples = sink.load_metric_samples(&austin.resource.resource_id).unwrap();
        assert_eq!(samples, austin.samples);
        assert_eq!(sink.load_incidents("Austin").unwrap(), austin.incidents);
        assert_eq!(sink.load_problems("Austin").unwrap(), austin.problems);
    }
}
