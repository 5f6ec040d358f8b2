//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Tables in dependency-free drop order.
pub const TABLES: &[&str] = &[
    "applications",
    "cloud_resources",
    "metric_samples",
    "incidents",
    "problems",
];

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS applications (
            id INTEGER PRIMARY KEY,
            app_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            criticality TEXT NOT NULL CHECK (criticality IN ('high', 'medium', 'low')),
            business_unit TEXT NOT NULL,
            business_service TEXT NOT NULL,
            owner TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cloud_resources (
            id INTEGER PRIMARY KEY,
            resource_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            location TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            provider TEXT NOT NULL CHECK (provider IN ('aws', 'azure', 'gcp', 'other')),
            region TEXT NOT NULL,
            environment TEXT NOT NULL,
            specifications_json TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metric_samples (
            id INTEGER PRIMARY KEY,
            resource_id TEXT NOT NULL,
            location TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            transactions INTEGER NOT NULL,
            average_transaction_time REAL NOT NULL,
            error_count INTEGER NOT NULL,
            cost REAL NOT NULL,
            cpu_utilization REAL NOT NULL,
            memory_utilization REAL NOT NULL,
            anomaly_categories TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS incidents (
            id INTEGER PRIMARY KEY,
            incident_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            location TEXT NOT NULL,
            category TEXT NOT NULL,
            priority INTEGER NOT NULL,
            impact TEXT NOT NULL,
            start_time TEXT NOT NULL,
            resolution_time TEXT,
            close_time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            affected_resources TEXT NOT NULL,
            estimated_cost_impact REAL NOT NULL,
            description TEXT NOT NULL,
            state_history TEXT NOT NULL,
            time_to_resolve_minutes REAL,
            time_to_close_minutes REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS problems (
            id INTEGER PRIMARY KEY,
            problem_id TEXT NOT NULL,
            app_id TEXT NOT NULL,
            location TEXT NOT NULL,
            category TEXT NOT NULL,
            priority INTEGER NOT NULL,
            impact TEXT NOT NULL,
            open_date TEXT NOT NULL,
            resolution_date TEXT NOT NULL,
            related_incident_ids TEXT NOT NULL,
            estimated_cost_impact REAL NOT NULL,
            description TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_metric_samples_resource_ts ON metric_samples(resource_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_incidents_start ON incidents(start_time);
        CREATE INDEX IF NOT EXISTS idx_incidents_incident_id ON incidents(incident_id);
        CREATE INDEX IF NOT EXISTS idx_problems_open ON problems(open_date);

        CREATE VIEW IF NOT EXISTS cost_data AS
            SELECT resource_id, timestamp, cost FROM metric_samples;

        CREATE VIEW IF NOT EXISTS resource_utilization AS
            SELECT resource_id, timestamp, cpu_utilization, memory_utilization FROM metric_samples;",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (1)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        for table in TABLES {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{}", table);
        }

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cost_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
