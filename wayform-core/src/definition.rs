//! Form definitions
//!
//! A [`FormDefinition`] is the authoring format for a form: header fields plus
//! the question list, loadable from JSON or TOML.
//!
//! ```toml
//! [form]
//! title = "Trip feedback"
//!
//! [[questions]]
//! id = "overall"
//! title = "How was your trip?"
//! position = 1
//! is_required = true
//! type = "RATING"
//! rating_scale = 5
//! ```

use crate::error::{Error, Result};
use crate::question::{Question, QuestionKind};
use crate::types::{DisplayOptions, Form};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Header fields of a form definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    /// Generated on import when absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default)]
    pub completion_message: Option<String>,
    #[serde(default)]
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub form: FormSpec,
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidDefinition(message.into())
}

impl FormDefinition {
    /// Load from a `.json` or `.toml` file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => Err(invalid(format!(
                "{}: expected a .json or .toml file",
                path.display()
            ))),
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| invalid(e.to_string()))
    }

    /// Check the ordering and reference invariants of the definition
    pub fn validate(&self) -> Result<()> {
        if self.form.title.trim().is_empty() {
            return Err(invalid("form title cannot be empty"));
        }

        let mut milestone_names = HashSet::new();
        for name in &self.form.milestones {
            if name.trim().is_empty() || !milestone_names.insert(name.as_str()) {
                return Err(invalid(format!("milestone names must be unique and non-empty: '{}'", name)));
            }
        }

        let mut ids = HashSet::new();
        let mut slots = HashSet::new();
        for question in &self.questions {
            if !question.id.is_empty() && !ids.insert(question.id.as_str()) {
                return Err(invalid(format!("duplicate question id {}", question.id)));
            }

            match (&question.milestone, self.form.milestones.is_empty()) {
                (Some(m), false) if !milestone_names.contains(m.as_str()) => {
                    return Err(invalid(format!(
                        "question {} names unknown milestone {}",
                        question.id, m
                    )));
                }
                (Some(m), true) => {
                    return Err(invalid(format!(
                        "question {} names milestone {} but the form has none",
                        question.id, m
                    )));
                }
                (None, false) => {
                    return Err(invalid(format!(
                        "question {} must belong to a milestone",
                        question.id
                    )));
                }
                _ => {}
            }

            if !slots.insert((question.milestone.as_deref(), question.position)) {
                return Err(invalid(format!(
                    "position {} is used twice{}",
                    question.position,
                    question
                        .milestone
                        .as_ref()
                        .map(|m| format!(" in milestone {}", m))
                        .unwrap_or_default()
                )));
            }

            validate_kind(question)?;
        }

        let positions: HashMap<&str, &Question> = self
            .questions
            .iter()
            .filter(|q| !q.id.is_empty())
            .map(|q| (q.id.as_str(), q))
            .collect();
        for question in &self.questions {
            let Some(condition) = &question.conditional_display else {
                continue;
            };
            let dependency = positions.get(condition.depends_on.as_str()).ok_or_else(|| {
                invalid(format!(
                    "question {} depends on unknown question {}",
                    question.id, condition.depends_on
                ))
            })?;
            if dependency.milestone != question.milestone || dependency.position >= question.position {
                return Err(invalid(format!(
                    "question {} must come after the question it depends on ({})",
                    question.id, condition.depends_on
                )));
            }
            if dependency.kind.is_structural() {
                return Err(invalid(format!(
                    "question {} depends on {} which takes no answer",
                    question.id, condition.depends_on
                )));
            }
        }

        Ok(())
    }

    /// Validate, assign missing ids and split into records ready to store
    pub fn into_records(self) -> Result<(Form, Vec<Question>)> {
        self.validate()?;

        let form_id = self
            .form
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut form = Form::new(form_id.clone(), self.form.title);
        form.description = self.form.description;
        form.display = self.form.display;
        form.completion_message = self.form.completion_message;
        form.milestones = self.form.milestones;

        let questions = self
            .questions
            .into_iter()
            .map(|mut q| {
                if q.id.is_empty() {
                    q.id = uuid::Uuid::new_v4().to_string();
                }
                q.form_id = form_id.clone();
                q
            })
            .collect();

        Ok((form, questions))
    }
}

/// Per-kind configuration sanity
fn validate_kind(question: &Question) -> Result<()> {
    let problem = match &question.kind {
        QuestionKind::SingleChoice { options }
        | QuestionKind::MultipleChoice { options }
        | QuestionKind::DragRank { options } => {
            let mut values = HashSet::new();
            if options.is_empty() {
                Some("needs at least one option".to_string())
            } else {
                options
                    .iter()
                    .find(|o| !values.insert(o.value.as_str()))
                    .map(|o| format!("option value '{}' is used twice", o.value))
            }
        }
        QuestionKind::Rating { rating_scale } if *rating_scale < 2 => {
            Some("rating scale must be at least 2".to_string())
        }
        QuestionKind::NumericScale { min, max } if min >= max => {
            Some(format!("scale minimum {} must be below maximum {}", min, max))
        }
        QuestionKind::BudgetAllocator { categories, total } => {
            if categories.is_empty() {
                Some("needs at least one category".to_string())
            } else if !total.is_finite() || *total <= 0.0 {
                Some("budget total must be positive".to_string())
            } else {
                None
            }
        }
        QuestionKind::ActivityInterest { activities, .. } if activities.is_empty() => {
            Some("needs at least one activity".to_string())
        }
        QuestionKind::MatrixRating { rows, columns } if rows.is_empty() || columns.is_empty() => {
            Some("needs at least one row and one column".to_string())
        }
        _ => None,
    };

    match problem {
        Some(message) => Err(invalid(format!(
            "{} question {}: {}",
            question.kind.tag(),
            question.id,
            message
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseValue;
    use crate::visibility::{Condition, Predicate};

    const TRIP_TOML: &str = r#"
[form]
title = "Trip feedback"
milestones = ["pre_trip", "post_trip"]

[[questions]]
id = "expectations"
title = "What are you looking forward to?"
position = 1
milestone = "pre_trip"
type = "LONG_TEXT"

[[questions]]
id = "budget"
title = "How will you split your budget?"
position = 2
milestone = "pre_trip"
type = "BUDGET_ALLOCATOR"
total = 1000
categories = [{ id = "food", label = "Food" }, { id = "lodging", label = "Lodging" }]

[[questions]]
id = "again"
title = "Would you travel with us again?"
position = 1
milestone = "post_trip"
is_required = true
type = "YES_NO"

[[questions]]
title = "Why not?"
position = 2
milestone = "post_trip"
type = "SHORT_TEXT"
conditional_display = { depends_on = "again", show_if = { op = "equals", value = false } }
"#;

    fn yes_no(id: &str, position: i32) -> Question {
        Question::new(id, id, position, QuestionKind::YesNo)
    }

    fn definition(questions: Vec<Question>) -> FormDefinition {
        FormDefinition {
            form: FormSpec {
                id: Some("f1".into()),
                title: "Poll".into(),
                description: None,
                display: DisplayOptions::default(),
                completion_message: None,
                milestones: vec![],
            },
            questions,
        }
    }

    #[test]
    fn test_toml_definition_loads() {
        let definition = FormDefinition::from_toml_str(TRIP_TOML).unwrap();
        definition.validate().unwrap();
        assert_eq!(definition.questions.len(), 4);
        assert_eq!(
            definition.questions[1].kind,
            QuestionKind::BudgetAllocator {
                categories: vec![
                    crate::question::BudgetCategory {
                        id: "food".into(),
                        label: "Food".into()
                    },
                    crate::question::BudgetCategory {
                        id: "lodging".into(),
                        label: "Lodging".into()
                    },
                ],
                total: 1000.0,
            }
        );

        let (form, questions) = definition.into_records().unwrap();
        assert!(!form.id.is_empty());
        assert_eq!(form.milestones.len(), 2);
        assert!(questions.iter().all(|q| q.form_id == form.id && !q.id.is_empty()));
        assert_eq!(
            questions[3].conditional_display.as_ref().unwrap().show_if,
            Predicate::Equals {
                value: ResponseValue::Bool(false)
            }
        );
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("trip.toml");
        std::fs::write(&toml_path, TRIP_TOML).unwrap();
        assert!(FormDefinition::from_path(&toml_path).is_ok());

        let json_path = dir.path().join("trip.json");
        let json = serde_json::to_string(&FormDefinition::from_toml_str(TRIP_TOML).unwrap()).unwrap();
        std::fs::write(&json_path, json).unwrap();
        let loaded = FormDefinition::from_path(&json_path).unwrap();
        assert_eq!(loaded.questions.len(), 4);

        let other = dir.path().join("trip.yaml");
        std::fs::write(&other, "form: {}").unwrap();
        assert!(matches!(
            FormDefinition::from_path(&other),
            Err(Error::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_rejects_condition_on_later_question() {
        let def = definition(vec![
            yes_no("q1", 1).shown_when(Condition::new("q2", Predicate::Answered)),
            yes_no("q2", 2),
        ]);
        assert!(matches!(def.validate(), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn test_rejects_unknown_dependency() {
        let def = definition(vec![
            yes_no("q1", 1),
            yes_no("q2", 2).shown_when(Condition::new("q9", Predicate::Answered)),
        ]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_positions() {
        let def = definition(vec![yes_no("q1", 1), yes_no("q2", 1)]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_milestone_tags_checked() {
        let mut def = definition(vec![yes_no("q1", 1).in_milestone("during")]);
        assert!(def.validate().is_err());

        def.form.milestones = vec!["before".into()];
        assert!(def.validate().is_err());

        def.questions = vec![yes_no("q1", 1).in_milestone("before"), yes_no("q2", 2)];
        assert!(def.validate().is_err());

        def.questions = vec![
            yes_no("q1", 1).in_milestone("before"),
            yes_no("q2", 2).in_milestone("before"),
        ];
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_choice_options() {
        let def = definition(vec![Question::new("q1", "Pick", 1, QuestionKind::SingleChoice {
            options: vec![],
        })]);
        assert!(def.validate().is_err());
    }
}
