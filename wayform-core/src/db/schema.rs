//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! Every collection is a table of JSON documents keyed by id; lookups the
//! engine does often get expression indexes over `json_extract`.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: one document table per collection
    r#"
    CREATE TABLE IF NOT EXISTS forms (
        id          TEXT PRIMARY KEY,
        data        JSON NOT NULL,
        created_at  DATETIME NOT NULL,
        updated_at  DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS questions (
        id          TEXT PRIMARY KEY,
        data        JSON NOT NULL,
        created_at  DATETIME NOT NULL,
        updated_at  DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
        id          TEXT PRIMARY KEY,
        data        JSON NOT NULL,
        created_at  DATETIME NOT NULL,
        updated_at  DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS responses (
        id          TEXT PRIMARY KEY,
        data        JSON NOT NULL,
        created_at  DATETIME NOT NULL,
        updated_at  DATETIME NOT NULL
    );
    "#,
    // Version 2: indexes for per-form and per-session lookups
    r#"
    CREATE INDEX IF NOT EXISTS idx_questions_form
        ON questions(json_extract(data, '$.form_id'));
    CREATE INDEX IF NOT EXISTS idx_sessions_form
        ON sessions(json_extract(data, '$.form_id'));
    CREATE INDEX IF NOT EXISTS idx_sessions_token
        ON sessions(json_extract(data, '$.token_hash'));
    CREATE INDEX IF NOT EXISTS idx_responses_form
        ON responses(json_extract(data, '$.form_id'));
    CREATE INDEX IF NOT EXISTS idx_responses_session
        ON responses(json_extract(data, '$.session_id'));
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn).unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["forms", "questions", "sessions", "responses"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }
}
