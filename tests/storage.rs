//! Persistence tests -- generate into a scratch database and read it back.

use std::path::Path;

use assert_cmd::Command;
use finops_datagen::config::AppConfig;
use finops_datagen::storage::{open_pool, RecordKind, SqliteSink};
use rusqlite::Connection;
use tempfile::TempDir;

const CONFIG: &str = r#"
[generation]
year = 2024
domain = "ecommerce"
locations = ["Austin", "Houston"]
seed = 42
reference_now = "2026-01-15T09:00:00"
builtin_schedule = false

[storage.retry]
max_attempts = 2
initial_backoff_ms = 0

[logging]
level = "warn"

[[anomalies]]
date = "2024-02-22"
location = "Houston"
type = "Website Outage"

[[anomalies]]
date = "2024-03-10"
location = "Austin"
category = "DDoS Attack"
start_hour = 10
end_hour = 14
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("finops.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

fn generate(config: &Path, db: &Path, extra: &[&str]) {
    Command::cargo_bin("finops-datagen")
        .unwrap()
        .env_remove("FINOPS_DATAGEN_CONFIG")
        .arg("--config")
        .arg(config)
        .arg("generate")
        .arg("--db")
        .arg(db)
        .args(extra)
        .assert()
        .success();
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn test_generate_writes_every_table() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let db = dir.path().join("nested").join("demo.db");
    generate(&config, &db, &[]);

    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM applications"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM cloud_resources"), 2);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM metric_samples"), 2 * 366 * 24);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM cost_data"), 2 * 366 * 24);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM resource_utilization"), 2 * 366 * 24);

    // Website Outage: one incident per hour, one problem.
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM incidents WHERE category = 'Website Outage'"),
        24
    );
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM problems WHERE location = 'Houston'"), 1);
    assert_eq!(
        count(
            &conn,
            "SELECT SUM(transactions) FROM metric_samples
             WHERE location = 'Houston' AND timestamp LIKE '2024-02-22%'"
        ),
        0
    );
    assert_eq!(
        count(
            &conn,
            "SELECT COUNT(*) FROM metric_samples
             WHERE location = 'Austin' AND anomaly_categories LIKE '%DDoS Attack%'"
        ),
        4
    );
}

#[test]
fn test_rerun_appends_and_reset_clears() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let db = dir.path().join("demo.db");

    generate(&config, &db, &[]);
    generate(&config, &db, &[]);
    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM applications"), 2);
    drop(conn);

    generate(&config, &db, &["--reset"]);
    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM applications"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM metric_samples"), 2 * 366 * 24);
}

#[test]
fn test_dry_run_leaves_no_database() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let db = dir.path().join("never.db");

    Command::cargo_bin("finops-datagen")
        .unwrap()
        .env_remove("FINOPS_DATAGEN_CONFIG")
        .arg("--config")
        .arg(&config)
        .args(["generate", "--dry-run", "--json", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicates::str::contains("\"seed\": 42"))
        .stdout(predicates::str::contains("\"persisted\": null"));
    assert!(!db.exists());
}

#[test]
fn test_incident_history_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("demo.db");

    let mut config: AppConfig = toml::from_str(CONFIG).unwrap();
    config.storage.database = db.clone();
    let report = tokio_test::block_on(finops_datagen::run(config, false)).unwrap();
    let persisted = report.persisted.unwrap();
    // Website Outage in Houston plus DDoS Attack in Austin
    assert_eq!(persisted.problems, 2);

    let sink = SqliteSink::new(open_pool(&db).unwrap());
    assert_eq!(sink.count(RecordKind::Incident).unwrap(), persisted.incidents);

    let incidents = sink.load_incidents("Houston").unwrap();
    assert_eq!(incidents.len(), 24);
    for inc in &incidents {
        assert!(inc.state_history.len() >= 3);
        assert!(inc.state().is_terminal());
    }

    let problems = sink.load_problems("Houston").unwrap();
    assert_eq!(problems[0].related_incident_ids.len(), 24);
}
