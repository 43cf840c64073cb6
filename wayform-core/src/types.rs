//! Core domain types for wayform
//!
//! These types are the canonical records that flow between the engine and
//! the record store.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Form** | A versioned collection instrument (survey or feedback form) |
//! | **Question** | One prompt within a Form, see [`crate::question`] |
//! | **Session** | One respondent's traversal of a Form ([`ResponseSession`]) |
//! | **Response** | One recorded answer to one Question within one Session |
//! | **Milestone** | A named, ordered segment of a multi-part Form |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Forms
// ============================================

/// Lifecycle status of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Draft => "draft",
            FormStatus::Active => "active",
            FormStatus::Archived => "archived",
        }
    }

    /// Draft → Active → Archived, with Draft → Archived allowed for abandoned drafts.
    pub fn can_transition_to(&self, next: FormStatus) -> bool {
        matches!(
            (self, next),
            (FormStatus::Draft, FormStatus::Active)
                | (FormStatus::Draft, FormStatus::Archived)
                | (FormStatus::Active, FormStatus::Archived)
        )
    }
}

impl std::str::FromStr for FormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(FormStatus::Draft),
            "active" => Ok(FormStatus::Active),
            "archived" => Ok(FormStatus::Archived),
            _ => Err(format!("unknown form status: {}", s)),
        }
    }
}

/// Visual theme a renderer should apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Brand,
}

/// Presentation options carried by a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Show a progress indicator while stepping through questions
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
    #[serde(default)]
    pub theme: Theme,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_progress: default_show_progress(),
            theme: Theme::default(),
        }
    }
}

fn default_show_progress() -> bool {
    true
}

/// A named collection activity.
///
/// Structural fields (milestones, questions) are frozen once sessions reference
/// the form; only metadata such as the title or completion message may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: FormStatus,
    #[serde(default)]
    pub display: DisplayOptions,
    /// Shown after the final submission
    #[serde(default)]
    pub completion_message: Option<String>,
    /// Ordered milestone names; empty for single-segment forms
    #[serde(default)]
    pub milestones: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    /// Create a draft form with default display options
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: FormStatus::Draft,
            display: DisplayOptions::default(),
            completion_message: None,
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_multi_milestone(&self) -> bool {
        !self.milestones.is_empty()
    }

    /// Move to `next`, enforcing the lifecycle order.
    pub fn transition(&mut self, next: FormStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition(format!(
                "form {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================
// Sessions
// ============================================

/// Status of a response session. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Expired,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Expired => "expired",
            SessionStatus::Completed => "completed",
        }
    }

    /// Completed and expired are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Active, SessionStatus::Expired)
                | (SessionStatus::Active, SessionStatus::Completed)
        )
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "expired" => Ok(SessionStatus::Expired),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(format!("unknown session status: {}", s)),
        }
    }
}

/// One respondent's traversal of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSession {
    pub id: String,
    pub form_id: String,
    /// SHA-256 of the resumption token; the token itself is never stored
    pub token_hash: String,
    pub status: SessionStatus,
    /// 0-based index into the form's milestones
    #[serde(default)]
    pub current_milestone: usize,
    #[serde(default)]
    pub completed_milestones: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Furthest question answered so far, used for drop-off counts
    #[serde(default)]
    pub last_question_id: Option<String>,
}

impl ResponseSession {
    /// Status as of `now`: an active session past `expires_at` reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.status == SessionStatus::Active && now >= self.expires_at {
            SessionStatus::Expired
        } else {
            self.status
        }
    }

    /// Seconds between creation and completion, if completed
    pub fn completion_secs(&self) -> Option<f64> {
        self.completed_at
            .map(|done| done.signed_duration_since(self.created_at).num_milliseconds() as f64 / 1000.0)
    }
}

// ============================================
// Responses
// ============================================

/// A typed answer value.
///
/// Serialized untagged so records hold plain JSON (`4`, `"Paris"`, `["a","b"]`,
/// `{"food": 300}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    /// Category → amount for allocator, interest and matrix questions
    Map(BTreeMap<String, f64>),
}

impl ResponseValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Blank text and empty collections count as "no answer".
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Scalar rendering used as a frequency key by the aggregator
    pub fn display_key(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(","),
            Self::Map(map) => serde_json::to_string(map).unwrap_or_default(),
        }
    }
}

impl From<&str> for ResponseValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ResponseValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for ResponseValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ResponseValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for ResponseValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<Vec<String>> for ResponseValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for ResponseValue {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<BTreeMap<String, f64>> for ResponseValue {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self::Map(map)
    }
}

/// Accumulated answers keyed by question id
pub type Responses = BTreeMap<String, ResponseValue>;

/// One persisted answer. At most one per (session, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// `"{session_id}:{question_id}"`, so re-answers overwrite
    pub id: String,
    pub session_id: String,
    pub question_id: String,
    pub form_id: String,
    pub value: ResponseValue,
    pub answered_at: DateTime<Utc>,
}

impl Response {
    pub fn record_id(session_id: &str, question_id: &str) -> String {
        format!("{}:{}", session_id, question_id)
    }

    pub fn new(session: &ResponseSession, question_id: &str, value: ResponseValue) -> Self {
        Self {
            id: Self::record_id(&session.id, question_id),
            session_id: session.id.clone(),
            question_id: question_id.to_string(),
            form_id: session.form_id.clone(),
            value,
            answered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_form_lifecycle() {
        let mut form = Form::new("f1", "Trip feedback");
        assert!(form.transition(FormStatus::Active).is_ok());
        assert!(form.transition(FormStatus::Draft).is_err());
        assert!(form.transition(FormStatus::Archived).is_ok());
        assert!(form.transition(FormStatus::Active).is_err());
    }

    #[test]
    fn test_session_status_only_moves_forward() {
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Completed));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Expired));
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Active));
        assert!(!SessionStatus::Expired.can_transition_to(SessionStatus::Completed));
        assert!(SessionStatus::Expired.is_terminal());
    }

    #[test]
    fn test_effective_status_past_expiry() {
        let now = Utc::now();
        let session = ResponseSession {
            id: "s1".into(),
            form_id: "f1".into(),
            token_hash: String::new(),
            status: SessionStatus::Active,
            current_milestone: 0,
            completed_milestones: vec![],
            created_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
            completed_at: None,
            last_question_id: None,
        };
        assert_eq!(session.effective_status(now), SessionStatus::Expired);
        assert_eq!(
            session.effective_status(now - Duration::minutes(90)),
            SessionStatus::Active
        );
    }

    #[test]
    fn test_response_value_json_shapes() {
        let values: Vec<ResponseValue> =
            serde_json::from_str(r#"[true, 4, "Lisbon", ["a", "b"], {"food": 250.5}]"#).unwrap();
        assert_eq!(values[0], ResponseValue::Bool(true));
        assert_eq!(values[1], ResponseValue::Number(4.0));
        assert_eq!(values[2], ResponseValue::from("Lisbon"));
        assert_eq!(values[3], ResponseValue::from(vec!["a", "b"]));
        assert_eq!(values[4].as_map().unwrap()["food"], 250.5);
    }

    #[test]
    fn test_blank_values_are_empty() {
        assert!(ResponseValue::from("   ").is_empty());
        assert!(ResponseValue::List(vec![]).is_empty());
        assert!(!ResponseValue::Bool(false).is_empty());
        assert!(!ResponseValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_display_key_integral_numbers() {
        assert_eq!(ResponseValue::Number(4.0).display_key(), "4");
        assert_eq!(ResponseValue::Number(4.5).display_key(), "4.5");
        assert_eq!(ResponseValue::Bool(true).display_key(), "true");
    }
}
