//! Database schema and migrations.

use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS test_executions (
            id TEXT PRIMARY KEY,
            test_name TEXT NOT NULL CHECK (length(test_name) > 0),
            start_time TEXT NOT NULL,
            duration INTEGER NOT NULL CHECK (duration >= 0),
            success_rate REAL NOT NULL CHECK (success_rate BETWEEN 0 AND 1),
            cost REAL NOT NULL CHECK (cost >= 0),
            validation INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_test_executions_start ON test_executions(start_time);
        CREATE INDEX IF NOT EXISTS idx_test_executions_name ON test_executions(test_name);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM test_executions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }

    #[test]
    fn test_check_constraints_reject_bad_rows() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let res = conn.execute(
            "INSERT INTO test_executions (id, test_name, start_time, duration, success_rate, cost)
             VALUES ('x', 'a', '2024-01-01T00:00:00+00:00', 10, 1.5, 0.1)",
            [],
        );
        assert!(res.is_err());
    }
}
