//! Conditional display resolution
//!
//! Conditions are plain data so they survive a trip through the record store:
//!
//! ```json
//! { "depends_on": "q3", "show_if": { "op": "includes", "value": "other" } }
//! ```
//!
//! [`is_visible`] is pure and is re-run on every navigation step, since a
//! respondent may go back and change the answer a condition depends on.

use crate::question::Question;
use crate::types::{ResponseValue, Responses};
use serde::{Deserialize, Serialize};

/// Visibility rule attached to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Id of an earlier question
    pub depends_on: String,
    pub show_if: Predicate,
}

impl Condition {
    pub fn new(depends_on: impl Into<String>, show_if: Predicate) -> Self {
        Self {
            depends_on: depends_on.into(),
            show_if,
        }
    }
}

/// Declarative predicate over a single answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { value: ResponseValue },
    NotEquals { value: ResponseValue },
    /// List contains the value; text contains it as a substring; map has it as a positive key
    Includes { value: String },
    Excludes { value: String },
    /// Scalar answer is one of `values`, or a list answer shares one of them
    AnyOf { values: Vec<String> },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    /// Any non-empty answer
    Answered,
}

impl Predicate {
    /// Evaluate against a recorded answer
    pub fn matches(&self, answer: &ResponseValue) -> bool {
        match self {
            Predicate::Equals { value } => answer == value,
            Predicate::NotEquals { value } => answer != value,
            Predicate::Includes { value } => includes(answer, value),
            Predicate::Excludes { value } => !includes(answer, value),
            Predicate::AnyOf { values } => match answer {
                ResponseValue::List(items) => items.iter().any(|i| values.contains(i)),
                other => values.contains(&other.display_key()),
            },
            Predicate::GreaterThan { value } => answer.as_number().is_some_and(|n| n > *value),
            Predicate::LessThan { value } => answer.as_number().is_some_and(|n| n < *value),
            Predicate::Answered => !answer.is_empty(),
        }
    }
}

fn includes(answer: &ResponseValue, needle: &str) -> bool {
    match answer {
        ResponseValue::List(items) => items.iter().any(|i| i == needle),
        ResponseValue::Text(text) => text.contains(needle),
        ResponseValue::Map(map) => map.get(needle).is_some_and(|v| *v > 0.0),
        ResponseValue::Bool(_) | ResponseValue::Number(_) => answer.display_key() == needle,
    }
}

/// Whether `question` should currently be shown.
///
/// Questions without a condition are always visible. A condition whose
/// dependency has no recorded answer resolves to hidden, so the question is
/// skipped rather than blocking progress.
pub fn is_visible(question: &Question, responses: &Responses) -> bool {
    let Some(condition) = &question.conditional_display else {
        return true;
    };

    match responses.get(&condition.depends_on) {
        Some(answer) => condition.show_if.matches(answer),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuestionKind;

    fn follow_up(predicate: Predicate) -> Question {
        Question::new("q2", "Tell us more", 2, QuestionKind::LongText {
            placeholder: None,
            max_character_count: None,
        })
        .shown_when(Condition::new("q1", predicate))
    }

    #[test]
    fn test_unconditional_always_visible() {
        let question = Question::new("q1", "Rate", 1, QuestionKind::Nps);
        assert!(is_visible(&question, &Responses::new()));
    }

    #[test]
    fn test_hidden_when_dependency_unanswered() {
        let question = follow_up(Predicate::Answered);
        assert!(!is_visible(&question, &Responses::new()));
    }

    #[test]
    fn test_reevaluates_when_answer_changes() {
        let question = follow_up(Predicate::Includes {
            value: "other".into(),
        });
        let mut responses = Responses::new();

        responses.insert("q1".into(), ResponseValue::from(vec!["beach", "other"]));
        assert!(is_visible(&question, &responses));

        responses.insert("q1".into(), ResponseValue::from(vec!["beach"]));
        assert!(!is_visible(&question, &responses));
    }

    #[test]
    fn test_numeric_predicates() {
        let low = Predicate::LessThan { value: 3.0 };
        assert!(low.matches(&ResponseValue::Number(2.0)));
        assert!(!low.matches(&ResponseValue::Number(3.0)));
        assert!(!low.matches(&ResponseValue::from("2")));
        assert!(Predicate::GreaterThan { value: 8.0 }.matches(&ResponseValue::Number(9.0)));
    }

    #[test]
    fn test_equals_and_any_of() {
        assert!(Predicate::Equals {
            value: ResponseValue::Bool(false)
        }
        .matches(&ResponseValue::Bool(false)));
        let any = Predicate::AnyOf {
            values: vec!["rail".into(), "bus".into()],
        };
        assert!(any.matches(&ResponseValue::from("bus")));
        assert!(any.matches(&ResponseValue::from(vec!["car", "rail"])));
        assert!(!any.matches(&ResponseValue::from("car")));
    }

    #[test]
    fn test_predicate_json() {
        let condition: Condition = serde_json::from_str(
            r#"{"depends_on": "q1", "show_if": {"op": "includes", "value": "other"}}"#,
        )
        .unwrap();
        assert_eq!(
            condition.show_if,
            Predicate::Includes {
                value: "other".into()
            }
        );
    }
}
