//! Question type taxonomy
//!
//! [`QuestionKind`] is the closed set of renderable question shapes. Each
//! variant carries only the configuration meaningful to it, and
//! [`QuestionKind::answer_shape`] fixes which [`ResponseValue`] shape it
//! accepts. The validation schema and the response aggregator both match on
//! this enum exhaustively, so a new variant fails to compile until both handle it.

use crate::types::ResponseValue;
use crate::visibility::Condition;
use serde::{Deserialize, Serialize};

/// One selectable option of a choice or ranking question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
    /// Value recorded in responses
    pub value: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A spend category of a budget allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: String,
    pub label: String,
}

/// A rateable activity of an interest question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub label: String,
    /// Grouping used when `group_by_category` is set
    #[serde(default)]
    pub category: Option<String>,
}

/// A row or column of a matrix rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixItem {
    pub id: String,
    pub label: String,
}

/// Shape of the value a question accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    /// Structural screens collect nothing
    None,
    Text,
    Bool,
    Number,
    List,
    Map,
}

/// Interest levels are rated on a fixed 1–5 scale
pub const INTEREST_MIN: f64 = 1.0;
pub const INTEREST_MAX: f64 = 5.0;

/// The closed set of question kinds with their type-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    ShortText {
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        max_character_count: Option<usize>,
    },
    LongText {
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        max_character_count: Option<usize>,
    },
    Email {
        #[serde(default)]
        placeholder: Option<String>,
    },
    SingleChoice {
        options: Vec<ChoiceOption>,
    },
    MultipleChoice {
        options: Vec<ChoiceOption>,
    },
    YesNo,
    Rating {
        rating_scale: u8,
    },
    Nps,
    NumericScale {
        min: i64,
        max: i64,
    },
    DragRank {
        options: Vec<ChoiceOption>,
    },
    BudgetAllocator {
        categories: Vec<BudgetCategory>,
        total: f64,
    },
    ActivityInterest {
        activities: Vec<Activity>,
        #[serde(default)]
        group_by_category: bool,
    },
    MatrixRating {
        rows: Vec<MatrixItem>,
        columns: Vec<MatrixItem>,
    },
    Date,
    Welcome {
        #[serde(default)]
        body: Option<String>,
    },
    ThankYou {
        #[serde(default)]
        body: Option<String>,
    },
    Instructions {
        #[serde(default)]
        body: Option<String>,
    },
    Statement {
        #[serde(default)]
        body: Option<String>,
    },
}

impl QuestionKind {
    /// Wire tag of this kind
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::ShortText { .. } => "SHORT_TEXT",
            QuestionKind::LongText { .. } => "LONG_TEXT",
            QuestionKind::Email { .. } => "EMAIL",
            QuestionKind::SingleChoice { .. } => "SINGLE_CHOICE",
            QuestionKind::MultipleChoice { .. } => "MULTIPLE_CHOICE",
            QuestionKind::YesNo => "YES_NO",
            QuestionKind::Rating { .. } => "RATING",
            QuestionKind::Nps => "NPS",
            QuestionKind::NumericScale { .. } => "NUMERIC_SCALE",
            QuestionKind::DragRank { .. } => "DRAG_RANK",
            QuestionKind::BudgetAllocator { .. } => "BUDGET_ALLOCATOR",
            QuestionKind::ActivityInterest { .. } => "ACTIVITY_INTEREST",
            QuestionKind::MatrixRating { .. } => "MATRIX_RATING",
            QuestionKind::Date => "DATE",
            QuestionKind::Welcome { .. } => "WELCOME",
            QuestionKind::ThankYou { .. } => "THANK_YOU",
            QuestionKind::Instructions { .. } => "INSTRUCTIONS",
            QuestionKind::Statement { .. } => "STATEMENT",
        }
    }

    /// Presentation-only screens: never required, never answered
    pub fn is_structural(&self) -> bool {
        self.answer_shape() == AnswerShape::None
    }

    pub fn answer_shape(&self) -> AnswerShape {
        match self {
            QuestionKind::ShortText { .. }
            | QuestionKind::LongText { .. }
            | QuestionKind::Email { .. }
            | QuestionKind::SingleChoice { .. }
            | QuestionKind::Date => AnswerShape::Text,
            QuestionKind::MultipleChoice { .. } | QuestionKind::DragRank { .. } => {
                AnswerShape::List
            }
            QuestionKind::YesNo => AnswerShape::Bool,
            QuestionKind::Rating { .. } | QuestionKind::Nps | QuestionKind::NumericScale { .. } => {
                AnswerShape::Number
            }
            QuestionKind::BudgetAllocator { .. }
            | QuestionKind::ActivityInterest { .. }
            | QuestionKind::MatrixRating { .. } => AnswerShape::Map,
            QuestionKind::Welcome { .. }
            | QuestionKind::ThankYou { .. }
            | QuestionKind::Instructions { .. }
            | QuestionKind::Statement { .. } => AnswerShape::None,
        }
    }

    /// Configured options for choice and ranking kinds
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            QuestionKind::SingleChoice { options }
            | QuestionKind::MultipleChoice { options }
            | QuestionKind::DragRank { options } => options,
            _ => &[],
        }
    }

    /// Recorded values of the configured options
    pub fn option_values(&self) -> Vec<String> {
        self.options().iter().map(|o| o.value.clone()).collect()
    }

    /// Label for a recorded option value, falling back to the value itself
    pub fn label_for<'a>(&'a self, value: &'a str) -> &'a str {
        self.options()
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }

    /// Ids and labels of the keys accepted in a map answer
    pub fn map_keys(&self) -> Vec<(&str, &str)> {
        match self {
            QuestionKind::BudgetAllocator { categories, .. } => categories
                .iter()
                .map(|c| (c.id.as_str(), c.label.as_str()))
                .collect(),
            QuestionKind::ActivityInterest { activities, .. } => activities
                .iter()
                .map(|a| (a.id.as_str(), a.label.as_str()))
                .collect(),
            QuestionKind::MatrixRating { rows, .. } => rows
                .iter()
                .map(|r| (r.id.as_str(), r.label.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `value` has the shape this kind accepts
    pub fn accepts_shape(&self, value: &ResponseValue) -> bool {
        matches!(
            (self.answer_shape(), value),
            (AnswerShape::Text, ResponseValue::Text(_))
                | (AnswerShape::Bool, ResponseValue::Bool(_))
                | (AnswerShape::Number, ResponseValue::Number(_))
                | (AnswerShape::List, ResponseValue::List(_))
                | (AnswerShape::Map, ResponseValue::Map(_))
        )
    }
}

/// One prompt within a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Assigned on import when left blank
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub form_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Display order; ties are broken by id
    pub position: i32,
    #[serde(default)]
    pub is_required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub conditional_display: Option<Condition>,
    /// Milestone this question belongs to (multi-milestone forms only)
    #[serde(default)]
    pub milestone: Option<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        position: i32,
        kind: QuestionKind,
    ) -> Self {
        Self {
            id: id.into(),
            form_id: String::new(),
            title: title.into(),
            description: None,
            position,
            is_required: false,
            kind,
            conditional_display: None,
            milestone: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn shown_when(mut self, condition: Condition) -> Self {
        self.conditional_display = Some(condition);
        self
    }

    pub fn in_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    /// Structural screens are never required regardless of the flag
    pub fn effectively_required(&self) -> bool {
        self.is_required && !self.kind.is_structural()
    }
}

/// Sort questions into display order: ascending position, then id.
pub fn sort_questions(questions: &mut [Question]) {
    questions.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}
