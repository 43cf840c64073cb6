//! Form analytics
//!
//! Point-in-time summary of one form: funnel counts, drop-off and a
//! [`QuestionSummary`] per question.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   ANALYTICS ENGINE                       │
//! │                                                          │
//! │  RecordStore ──► form + questions + sessions + responses │
//! │                        │                                 │
//! │        ┌───────────────┼─────────────────┐               │
//! │        ▼               ▼                 ▼               │
//! │   views/submissions   drop-off    aggregate() per question│
//! │        └───────────────┴─────────────────┘               │
//! │                        ▼                                 │
//! │                  FormAnalytics                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is cached or locked: two calls may see different snapshots if
//! submissions land in between.

use crate::aggregate::{aggregate, round_to, QuestionSummary};
use crate::error::Result;
use crate::store::records;
use crate::store::RecordStore;
use crate::types::{ResponseValue, SessionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Sessions that stopped after answering a given question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropOff {
    pub question_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAnalytics {
    pub question_id: String,
    pub title: String,
    /// Question type tag, e.g. `RATING`
    pub kind: String,
    pub summary: QuestionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormAnalytics {
    pub form_id: String,
    /// Sessions opened
    pub views: usize,
    /// Sessions completed
    pub submissions: usize,
    /// Percentage of views that completed; 0 with no views
    pub completion_rate: f64,
    pub drop_off: Vec<DropOff>,
    pub average_completion_secs: Option<f64>,
    pub questions: Vec<QuestionAnalytics>,
    pub computed_at: DateTime<Utc>,
}

/// Computes [`FormAnalytics`] from a record store
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    decimal_places: u32,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl AnalyticsEngine {
    pub fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    pub fn compute(&self, store: &dyn RecordStore, form_id: &str) -> Result<FormAnalytics> {
        let start = Instant::now();
        tracing::info!(form_id, "Computing form analytics");

        let form = records::require_form(store, form_id)?;
        let questions = records::form_questions(store, &form.id)?;
        let sessions = records::form_sessions(store, &form.id)?;
        let responses = records::form_responses(store, &form.id)?;

        let views = sessions.len();
        let completed: Vec<_> = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .collect();
        let submissions = completed.len();
        let completion_rate = if views == 0 {
            0.0
        } else {
            round_to(submissions as f64 * 100.0 / views as f64, self.decimal_places)
        };

        let durations: Vec<f64> = completed.iter().filter_map(|s| s.completion_secs()).collect();
        let average_completion_secs = if durations.is_empty() {
            None
        } else {
            Some(round_to(
                durations.iter().sum::<f64>() / durations.len() as f64,
                self.decimal_places,
            ))
        };

        let mut last_answered: HashMap<&str, usize> = HashMap::new();
        for session in sessions.iter().filter(|s| s.status != SessionStatus::Completed) {
            if let Some(question_id) = &session.last_question_id {
                *last_answered.entry(question_id.as_str()).or_default() += 1;
            }
        }
        let drop_off = questions
            .iter()
            .filter_map(|q| {
                last_answered.get(q.id.as_str()).map(|&count| DropOff {
                    question_id: q.id.clone(),
                    count,
                })
            })
            .collect();

        let mut by_question: HashMap<&str, Vec<ResponseValue>> = HashMap::new();
        for response in &responses {
            by_question
                .entry(response.question_id.as_str())
                .or_default()
                .push(response.value.clone());
        }

        let question_analytics = questions
            .iter()
            .filter(|q| !q.kind.is_structural())
            .map(|q| {
                let values = by_question.get(q.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                QuestionAnalytics {
                    question_id: q.id.clone(),
                    title: q.title.clone(),
                    kind: q.kind.tag().to_string(),
                    summary: aggregate(q, values, self.decimal_places),
                }
            })
            .collect();

        tracing::debug!(
            form_id,
            views,
            submissions,
            responses = responses.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Form analytics computed"
        );

        Ok(FormAnalytics {
            form_id: form.id,
            views,
            submissions,
            completion_rate,
            drop_off,
            average_completion_secs,
            questions: question_analytics,
            computed_at: Utc::now(),
        })
    }
}
