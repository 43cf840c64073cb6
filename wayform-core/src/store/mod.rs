//! Record store abstraction
//!
//! The engine persists four kinds of records through [`RecordStore`]. Records
//! are JSON objects carrying a string `id`; the store knows nothing about their
//! shape beyond that and the fields named in a [`Filter`] or [`Order`].
//!
//! [`crate::db::Database`] is the SQLite implementation. Typed conversions
//! live in [`records`].

pub mod records;

use crate::error::Result;
use serde_json::Value;

/// A named set of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Forms,
    Questions,
    Sessions,
    Responses,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Forms,
        Collection::Questions,
        Collection::Sessions,
        Collection::Responses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Forms => "forms",
            Collection::Questions => "questions",
            Collection::Sessions => "sessions",
            Collection::Responses => "responses",
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "forms" => Ok(Collection::Forms),
            "questions" => Ok(Collection::Questions),
            "sessions" => Ok(Collection::Sessions),
            "responses" => Ok(Collection::Responses),
            _ => Err(format!("unknown collection: {}", s)),
        }
    }
}

/// Conjunction of top-level field equality clauses. An empty filter matches
/// every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field == value` clause
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Evaluate against an in-memory record
    pub fn matches(&self, record: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }
}

/// Sort order over one top-level field. Ties fall back to record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Persistence interface used by the engine.
///
/// Implementations must be safe to share across threads; the service calls
/// them from blocking tasks during submission.
pub trait RecordStore: Send + Sync {
    /// Add a new record and return it as stored. Fails with `Conflict` if the
    /// id already exists.
    fn insert(&self, collection: Collection, record: &Value) -> Result<Value>;

    /// Merge the top-level keys of `patch` into an existing record and return
    /// the merged record. Fails with `NotFound` if there is no record with `id`.
    fn update(&self, collection: Collection, id: &str, patch: &Value) -> Result<Value>;

    fn find(&self, collection: Collection, filter: &Filter, order: Option<&Order>) -> Result<Vec<Value>>;

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;
}

/// Pull the string id out of a record
pub(crate) fn record_id(record: &Value) -> Result<&str> {
    record
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| crate::Error::InvalidDefinition("record has no string id".to_string()))
}

/// Shallow merge: top-level keys of `patch` replace those of `target`.
pub(crate) fn merge_top_level(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches() {
        let record = json!({"id": "r1", "form_id": "f1", "status": "active"});
        assert!(Filter::new().matches(&record));
        assert!(Filter::new().eq("form_id", "f1").matches(&record));
        assert!(!Filter::new()
            .eq("form_id", "f1")
            .eq("status", "completed")
            .matches(&record));
        assert!(!Filter::new().eq("missing", "x").matches(&record));
    }

    #[test]
    fn test_merge_replaces_whole_values() {
        let mut record = json!({"id": "r1", "value": {"food": 1.0, "lodging": 2.0}, "n": 1});
        merge_top_level(&mut record, &json!({"value": {"food": 5.0}}));
        assert_eq!(record, json!({"id": "r1", "value": {"food": 5.0}, "n": 1}));
    }

    #[test]
    fn test_collection_round_trips_name() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
    }
}
