//! SQLite record store
//!
//! Implements [`RecordStore`] over the document tables created by
//! [`super::schema`]. Filters and ordering are pushed down to SQLite with
//! `json_extract`.

use crate::error::{Error, Result};
use crate::store::{merge_top_level, record_id, Collection, Filter, Order, RecordStore};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;  -- 16MB cache
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of records in a collection
    pub fn count(&self, collection: Collection) -> Result<i64> {
        let conn = self.connection();
        let sql = format!("SELECT COUNT(*) FROM {}", collection.as_str());
        let count: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(count)
    }

    fn load(conn: &Connection, collection: Collection, id: &str) -> Result<Option<Value>> {
        let sql = format!("SELECT data FROM {} WHERE id = ?", collection.as_str());
        let data: Option<String> = conn
            .query_row(&sql, [id], |row| row.get(0))
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(Error::from))
            .transpose()
    }
}

/// SQLite value to compare `json_extract` output against
fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

impl RecordStore for Database {
    fn insert(&self, collection: Collection, record: &Value) -> Result<Value> {
        let id = record_id(record)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.connection();

        let sql = format!(
            "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            collection.as_str()
        );
        match conn.execute(&sql, params![id, record.to_string(), now]) {
            Ok(_) => {
                tracing::trace!(collection = collection.as_str(), id, "Inserted record");
                Ok(record.clone())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::Conflict(format!(
                    "{} record {} already exists",
                    collection.as_str(),
                    id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update(&self, collection: Collection, id: &str, patch: &Value) -> Result<Value> {
        let conn = self.connection();

        let mut record = Self::load(&conn, collection, id)?
            .ok_or_else(|| Error::NotFound(format!("{} record {}", collection.as_str(), id)))?;
        merge_top_level(&mut record, patch);

        let sql = format!(
            "UPDATE {} SET data = ?1, updated_at = ?2 WHERE id = ?3",
            collection.as_str()
        );
        conn.execute(&sql, params![record.to_string(), Utc::now().to_rfc3339(), id])?;
        tracing::trace!(collection = collection.as_str(), id, "Updated record");
        Ok(record)
    }

    fn find(&self, collection: Collection, filter: &Filter, order: Option<&Order>) -> Result<Vec<Value>> {
        let conn = self.connection();

        let mut sql = format!("SELECT data FROM {} WHERE 1=1", collection.as_str());
        let mut params: Vec<SqlValue> = vec![];

        for (field, value) in &filter.clauses {
            sql.push_str(" AND json_extract(data, ?) IS ?");
            params.push(SqlValue::Text(json_path(field)));
            params.push(sql_value(value));
        }

        match order {
            Some(order) => {
                sql.push_str(" ORDER BY json_extract(data, ?)");
                sql.push_str(if order.descending { " DESC" } else { " ASC" });
                sql.push_str(", id ASC");
                params.push(SqlValue::Text(json_path(&order.field)));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(Error::from))
            .collect()
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let conn = self.connection();
        Self::load(&conn, collection, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_insert_and_get() {
        let db = test_db();
        let record = json!({"id": "f1", "title": "Trip feedback", "status": "draft"});
        assert_eq!(db.insert(Collection::Forms, &record).unwrap(), record);

        assert_eq!(db.get(Collection::Forms, "f1").unwrap(), Some(record));
        assert_eq!(db.get(Collection::Forms, "missing").unwrap(), None);
        assert_eq!(db.get(Collection::Questions, "f1").unwrap(), None);
    }

    #[test]
    fn test_insert_duplicate_is_conflict() {
        let db = test_db();
        db.insert(Collection::Forms, &json!({"id": "f1"})).unwrap();
        let err = db.insert(Collection::Forms, &json!({"id": "f1"})).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(db.count(Collection::Forms).unwrap(), 1);
    }

    #[test]
    fn test_insert_requires_id() {
        let db = test_db();
        let err = db.insert(Collection::Forms, &json!({"title": "x"})).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn test_update_merges_top_level() {
        let db = test_db();
        db.insert(
            Collection::Sessions,
            &json!({"id": "s1", "status": "active", "current_milestone": 0}),
        )
        .unwrap();

        let merged = db
            .update(Collection::Sessions, "s1", &json!({"status": "completed"}))
            .unwrap();
        assert_eq!(merged["id"], "s1");
        assert_eq!(merged["status"], "completed");
        assert_eq!(merged["current_milestone"], 0);

        let stored = db.get(Collection::Sessions, "s1").unwrap().unwrap();
        assert_eq!(stored, merged);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let db = test_db();
        let err = db
            .update(Collection::Sessions, "nope", &json!({"status": "completed"}))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_find_filters_and_orders() {
        let db = test_db();
        for (id, form, position) in [("q1", "f1", 3), ("q2", "f1", 1), ("q3", "f2", 2), ("q4", "f1", 2)] {
            db.insert(
                Collection::Questions,
                &json!({"id": id, "form_id": form, "position": position, "is_required": position == 1}),
            )
            .unwrap();
        }

        let ids = |records: Vec<Value>| -> Vec<String> {
            records
                .iter()
                .map(|r| r["id"].as_str().unwrap().to_string())
                .collect()
        };

        let found = db
            .find(
                Collection::Questions,
                &Filter::new().eq("form_id", "f1"),
                Some(&Order::asc("position")),
            )
            .unwrap();
        assert_eq!(ids(found), vec!["q2", "q4", "q1"]);

        let found = db
            .find(
                Collection::Questions,
                &Filter::new().eq("form_id", "f1"),
                Some(&Order::desc("position")),
            )
            .unwrap();
        assert_eq!(ids(found), vec!["q1", "q4", "q2"]);

        let found = db
            .find(
                Collection::Questions,
                &Filter::new().eq("is_required", true).eq("position", 1),
                None,
            )
            .unwrap();
        assert_eq!(ids(found), vec!["q2"]);

        assert!(db
            .find(Collection::Questions, &Filter::new().eq("form_id", "f9"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wayform.db");

        {
            let db = Database::open(&path).unwrap();
            db.migrate().unwrap();
            db.insert(Collection::Forms, &json!({"id": "f1"})).unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(db.get(Collection::Forms, "f1").unwrap().is_some());
    }
}
