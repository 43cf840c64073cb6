//! Validation schema derived from an ordered question list
//!
//! [`ValidationSchema::build`] maps each question id to a [`FieldRule`].
//! Validating a field either passes or yields [`Error::Validation`] carrying a
//! message fit to show next to the question.

use crate::error::{Error, Result};
use crate::question::{Question, QuestionKind, INTEREST_MAX, INTEREST_MIN};
use crate::types::{ResponseValue, Responses};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const ALLOCATION_EPSILON: f64 = 1e-6;

/// Structural rule for one answer field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// Structural screens: always valid
    Unchecked,
    Text { max_len: Option<usize> },
    Email,
    Date,
    Boolean,
    /// One of the configured option values
    OneOf { values: Vec<String> },
    /// Subset of the configured option values
    ManyOf { values: Vec<String> },
    /// Ordered subset of option values without duplicates
    Ranking { values: Vec<String> },
    IntegerRange { min: i64, max: i64 },
    /// Non-negative amounts per category, summing to at most `total`
    Allocation { keys: Vec<String>, total: f64 },
    /// Integer score in `[min, max]` per key
    KeyedScale { keys: Vec<String>, min: i64, max: i64 },
}

impl FieldRule {
    /// Derive the rule for a question kind
    pub fn for_kind(kind: &QuestionKind) -> Self {
        let map_keys = |kind: &QuestionKind| -> Vec<String> {
            kind.map_keys()
                .into_iter()
                .map(|(id, _)| id.to_string())
                .collect()
        };

        match kind {
            QuestionKind::ShortText {
                max_character_count,
                ..
            }
            | QuestionKind::LongText {
                max_character_count,
                ..
            } => FieldRule::Text {
                max_len: *max_character_count,
            },
            QuestionKind::Email { .. } => FieldRule::Email,
            QuestionKind::Date => FieldRule::Date,
            QuestionKind::YesNo => FieldRule::Boolean,
            QuestionKind::SingleChoice { .. } => FieldRule::OneOf {
                values: kind.option_values(),
            },
            QuestionKind::MultipleChoice { .. } => FieldRule::ManyOf {
                values: kind.option_values(),
            },
            QuestionKind::DragRank { .. } => FieldRule::Ranking {
                values: kind.option_values(),
            },
            QuestionKind::Rating { rating_scale } => FieldRule::IntegerRange {
                min: 1,
                max: i64::from(*rating_scale),
            },
            QuestionKind::Nps => FieldRule::IntegerRange { min: 0, max: 10 },
            QuestionKind::NumericScale { min, max } => FieldRule::IntegerRange {
                min: *min,
                max: *max,
            },
            QuestionKind::BudgetAllocator { total, .. } => FieldRule::Allocation {
                keys: map_keys(kind),
                total: *total,
            },
            QuestionKind::ActivityInterest { .. } => FieldRule::KeyedScale {
                keys: map_keys(kind),
                min: INTEREST_MIN as i64,
                max: INTEREST_MAX as i64,
            },
            QuestionKind::MatrixRating { columns, .. } => FieldRule::KeyedScale {
                keys: map_keys(kind),
                min: 1,
                max: columns.len() as i64,
            },
            QuestionKind::Welcome { .. }
            | QuestionKind::ThankYou { .. }
            | QuestionKind::Instructions { .. }
            | QuestionKind::Statement { .. } => FieldRule::Unchecked,
        }
    }

    /// Check a present, non-empty value. Returns the failure message.
    fn check(&self, value: &ResponseValue) -> std::result::Result<(), String> {
        match self {
            FieldRule::Unchecked => Ok(()),
            FieldRule::Text { max_len } => {
                let text = expect_text(value)?;
                match max_len {
                    Some(max) if text.chars().count() > *max => {
                        Err(format!("Must be at most {} characters", max))
                    }
                    _ => Ok(()),
                }
            }
            FieldRule::Email => {
                let text = expect_text(value)?;
                if EMAIL_RE.is_match(text.trim()) {
                    Ok(())
                } else {
                    Err("Please enter a valid email address".to_string())
                }
            }
            FieldRule::Date => {
                let text = expect_text(value)?;
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                    .map(|_| ())
                    .map_err(|_| "Please enter a date as YYYY-MM-DD".to_string())
            }
            FieldRule::Boolean => match value {
                ResponseValue::Bool(_) => Ok(()),
                other => Err(shape_error("yes/no", other)),
            },
            FieldRule::OneOf { values } => {
                let text = expect_text(value)?;
                if values.iter().any(|v| v == text) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of the available options", text))
                }
            }
            FieldRule::ManyOf { values } => {
                let items = expect_list(value)?;
                match items.iter().find(|i| !values.contains(i)) {
                    Some(unknown) => {
                        Err(format!("'{}' is not one of the available options", unknown))
                    }
                    None => Ok(()),
                }
            }
            FieldRule::Ranking { values } => {
                let items = expect_list(value)?;
                if let Some(unknown) = items.iter().find(|i| !values.contains(i)) {
                    return Err(format!("'{}' is not one of the available options", unknown));
                }
                let mut seen = std::collections::HashSet::new();
                if items.iter().all(|i| seen.insert(i)) {
                    Ok(())
                } else {
                    Err("Each option can only be ranked once".to_string())
                }
            }
            FieldRule::IntegerRange { min, max } => {
                let n = expect_integer(value)?;
                if n < *min || n > *max {
                    Err(format!("Must be a whole number between {} and {}", min, max))
                } else {
                    Ok(())
                }
            }
            FieldRule::Allocation { keys, total } => {
                let map = expect_map(value)?;
                check_keys(map, keys)?;
                if map.values().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err("Amounts cannot be negative".to_string());
                }
                let sum: f64 = map.values().sum();
                if sum > total + ALLOCATION_EPSILON {
                    Err(format!("Allocations add up to {} but the budget is {}", sum, total))
                } else {
                    Ok(())
                }
            }
            FieldRule::KeyedScale { keys, min, max } => {
                let map = expect_map(value)?;
                check_keys(map, keys)?;
                for (key, score) in map {
                    if score.fract() != 0.0 || (*score as i64) < *min || (*score as i64) > *max {
                        return Err(format!(
                            "Score for '{}' must be a whole number between {} and {}",
                            key, min, max
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

fn shape_error(expected: &str, got: &ResponseValue) -> String {
    format!("Expected a {} answer, got {}", expected, got.type_name())
}

fn expect_text(value: &ResponseValue) -> std::result::Result<&str, String> {
    value.as_str().ok_or_else(|| shape_error("text", value))
}

fn expect_list(value: &ResponseValue) -> std::result::Result<&[String], String> {
    value.as_list().ok_or_else(|| shape_error("list", value))
}

fn expect_map(value: &ResponseValue) -> std::result::Result<&BTreeMap<String, f64>, String> {
    value.as_map().ok_or_else(|| shape_error("keyed", value))
}

fn expect_integer(value: &ResponseValue) -> std::result::Result<i64, String> {
    match value.as_number() {
        Some(n) if n.is_finite() && n.fract() == 0.0 => Ok(n as i64),
        Some(_) => Err("Must be a whole number".to_string()),
        None => Err(shape_error("number", value)),
    }
}

fn check_keys(map: &BTreeMap<String, f64>, keys: &[String]) -> std::result::Result<(), String> {
    match map.keys().find(|k| !keys.contains(k)) {
        Some(unknown) => Err(format!("'{}' is not a known item", unknown)),
        None => Ok(()),
    }
}

/// Rule plus requiredness for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub rule: FieldRule,
    pub required: bool,
}

/// Validator for every answer field of a question list
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl ValidationSchema {
    pub fn build(questions: &[Question]) -> Self {
        let fields = questions
            .iter()
            .map(|q| {
                (
                    q.id.clone(),
                    FieldSpec {
                        rule: FieldRule::for_kind(&q.kind),
                        required: q.effectively_required(),
                    },
                )
            })
            .collect();
        Self { fields }
    }

    pub fn field(&self, question_id: &str) -> Option<&FieldSpec> {
        self.fields.get(question_id)
    }

    /// Validate one answer. `None` and blank values count as absent.
    pub fn validate_field(&self, question_id: &str, value: Option<&ResponseValue>) -> Result<()> {
        let spec = self
            .fields
            .get(question_id)
            .ok_or_else(|| Error::NotFound(format!("question {}", question_id)))?;

        match value.filter(|v| !v.is_empty()) {
            None if spec.required => Err(Error::validation(
                question_id,
                "This question is required",
            )),
            None => Ok(()),
            Some(v) => spec
                .rule
                .check(v)
                .map_err(|message| Error::validation(question_id, message)),
        }
    }

    /// Validate every field accepted by `include`; returns question id → message.
    pub fn validate_all<F>(&self, responses: &Responses, include: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> bool,
    {
        self.fields
            .keys()
            .filter(|id| include(id))
            .filter_map(|id| match self.validate_field(id, responses.get(id)) {
                Err(Error::Validation { message, .. }) => Some((id.clone(), message)),
                _ => None,
            })
            .collect()
    }
}
