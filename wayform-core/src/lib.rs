//! # wayform-core
//!
//! Core library for wayform - a dynamic survey and feedback form engine.
//!
//! This library provides:
//! - A closed taxonomy of question types with typed answer shapes
//! - Validation schemas derived from a form's questions
//! - Declarative conditional display
//! - A reducer-driven wizard for stepping through questions
//! - Multi-milestone sessions, response aggregation and form analytics
//! - A record store abstraction with a SQLite implementation
//!
//! ## Architecture
//!
//! ```text
//! FormDefinition ──► SurveyService ──► RecordStore (Database)
//!                        │
//!        ┌───────────────┼──────────────────┐
//!        ▼               ▼                  ▼
//!   WizardState    MilestoneCursor    AnalyticsEngine
//!   (validation,                      (aggregate per
//!    visibility)                       question)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayform_core::{Config, Database, ServiceConfig, SurveyService};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let service = SurveyService::new(Arc::new(db), ServiceConfig::from(&config));
//! for form in service.list_forms().expect("failed to list forms") {
//!     println!("{} {}", form.id, form.title);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{aggregate, QuestionSummary};
pub use analytics::{AnalyticsEngine, FormAnalytics};
pub use config::Config;
pub use db::Database;
pub use definition::FormDefinition;
pub use error::{Error, Result};
pub use milestone::{MilestoneCursor, MilestoneOutcome, MilestonePlan};
pub use question::{Question, QuestionKind};
pub use service::{AnswerOutcome, ServiceConfig, SessionHandle, SubmitOutcome, SurveyService};
pub use store::{Collection, Filter, Order, RecordStore};
pub use types::*;
pub use validation::ValidationSchema;
pub use visibility::{is_visible, Condition, Predicate};
pub use wizard::{Direction, Step, WizardAction, WizardPosition, WizardState};

// Public modules
pub mod aggregate;
pub mod analytics;
pub mod config;
pub mod db;
pub mod definition;
pub mod error;
pub mod logging;
pub mod milestone;
pub mod question;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;
pub mod visibility;
pub mod wizard;
