//! Database layer for wayform
//!
//! SQLite-backed [`crate::store::RecordStore`] with:
//! - Schema migrations
//! - JSON document tables with `json_extract` filters

pub mod repo;
pub mod schema;

pub use repo::Database;
