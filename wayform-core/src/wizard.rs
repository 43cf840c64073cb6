//! Wizard state machine
//!
//! A [`WizardState`] owns everything one respondent's pass over a question set
//! needs: the ordered question snapshot, where the respondent is, which way
//! they last moved, the accumulated answers, field errors and the submission
//! status. Every transition goes through [`WizardState::reduce`].
//!
//! ```text
//! Welcome ──next──► Question(i) ──next──► Question(j) ... ──next──► Submitting ──ok──► Completed
//!    ▲                  │  ▲                                          │   ▲
//!    └─────previous─────┘  └──────────────previous────────────────────┘   └─ failed (retry)
//! ```
//!
//! Hidden questions are skipped in both directions. Visibility is recomputed
//! from the answers on every step, so changing an earlier answer can reveal or
//! hide later questions.

use crate::error::{Error, Result};
use crate::question::{sort_questions, Question, QuestionKind};
use crate::types::{ResponseValue, Responses};
use crate::validation::ValidationSchema;
use crate::visibility::is_visible;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where the respondent currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum WizardPosition {
    /// Initial screen, only when the first question is a welcome screen
    Welcome,
    /// Index into the ordered question snapshot
    Question(usize),
    Submitting,
    Completed,
}

/// Direction of the last move, for transition animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    InFlight,
    /// Last attempt failed; submitting again is allowed
    Failed(String),
}

/// Inputs to [`WizardState::reduce`]
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    /// Validate and record (or clear, with `None`) one answer
    Answer {
        question_id: String,
        value: Option<ResponseValue>,
    },
    Next,
    Previous,
    BeginSubmit,
    SubmitSucceeded,
    SubmitFailed(String),
    /// Discard all in-memory progress
    Reset,
}

/// What a renderer needs to draw the current step
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub position: WizardPosition,
    pub question: Option<Question>,
    /// Previously entered value, for pre-populating the input
    pub value: Option<ResponseValue>,
    pub is_first: bool,
    pub is_last: bool,
    pub errors: BTreeMap<String, String>,
    pub direction: Direction,
    /// Fraction of visible questions before this one, in `[0, 1]`
    pub progress: f32,
}

#[derive(Debug, Clone)]
pub struct WizardState {
    questions: Vec<Question>,
    schema: ValidationSchema,
    has_welcome: bool,
    pub position: WizardPosition,
    pub direction: Direction,
    pub responses: Responses,
    pub errors: BTreeMap<String, String>,
    pub submission: SubmissionStatus,
}

impl WizardState {
    /// Start a wizard over a question set. Questions are visited in ascending
    /// position, ties broken by id.
    pub fn new(mut questions: Vec<Question>) -> Self {
        sort_questions(&mut questions);
        let schema = ValidationSchema::build(&questions);
        let has_welcome = matches!(
            questions.first().map(|q| &q.kind),
            Some(QuestionKind::Welcome { .. })
        );

        let mut state = Self {
            questions,
            schema,
            has_welcome,
            position: WizardPosition::Welcome,
            direction: Direction::None,
            responses: Responses::new(),
            errors: BTreeMap::new(),
            submission: SubmissionStatus::Idle,
        };
        state.position = state.initial_position();
        state
    }

    /// Rebuild a wizard from previously recorded answers, positioned at the
    /// first visible question that still lacks an answer.
    pub fn restore(questions: Vec<Question>, responses: Responses) -> Self {
        let mut state = Self::new(questions);
        state.responses = responses;
        let visible = state.visibility();
        let pending = (state.first_step_index()..state.questions.len()).find(|&i| {
            visible[i]
                && !state.questions[i].kind.is_structural()
                && !state.responses.contains_key(&state.questions[i].id)
        });
        state.position = match pending {
            Some(i) => WizardPosition::Question(i),
            None => match state.last_visible() {
                Some(i) => WizardPosition::Question(i),
                None => state.initial_position(),
            },
        };
        state
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn schema(&self) -> &ValidationSchema {
        &self.schema
    }

    pub fn is_completed(&self) -> bool {
        self.position == WizardPosition::Completed
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionStatus::InFlight
    }

    /// The question due for display, if any
    pub fn current_question(&self) -> Option<&Question> {
        match self.position {
            WizardPosition::Welcome => self.questions.first(),
            WizardPosition::Question(i) => self.questions.get(i),
            WizardPosition::Submitting | WizardPosition::Completed => None,
        }
    }

    /// Apply one action. On error the state is left as it was, except that a
    /// validation failure is recorded in `errors` for the offending question.
    pub fn reduce(&mut self, action: WizardAction) -> Result<()> {
        if self.submission == SubmissionStatus::InFlight
            && !matches!(
                action,
                WizardAction::SubmitSucceeded | WizardAction::SubmitFailed(_)
            )
        {
            return Err(Error::Conflict("a submission is already in flight".to_string()));
        }
        if self.is_completed() && action != WizardAction::Reset {
            return Err(Error::InvalidTransition(
                "the wizard has already been completed".to_string(),
            ));
        }

        match action {
            WizardAction::Answer { question_id, value } => self.answer(&question_id, value),
            WizardAction::Next => self.next(),
            WizardAction::Previous => {
                self.previous();
                Ok(())
            }
            WizardAction::BeginSubmit => self.begin_submit(),
            WizardAction::SubmitSucceeded => {
                if self.submission != SubmissionStatus::InFlight {
                    return Err(Error::InvalidTransition("no submission in flight".to_string()));
                }
                self.submission = SubmissionStatus::Idle;
                self.position = WizardPosition::Completed;
                self.direction = Direction::Forward;
                Ok(())
            }
            WizardAction::SubmitFailed(message) => {
                if self.submission != SubmissionStatus::InFlight {
                    return Err(Error::InvalidTransition("no submission in flight".to_string()));
                }
                self.submission = SubmissionStatus::Failed(message);
                Ok(())
            }
            WizardAction::Reset => {
                self.responses.clear();
                self.errors.clear();
                self.submission = SubmissionStatus::Idle;
                self.direction = Direction::None;
                self.position = self.initial_position();
                Ok(())
            }
        }
    }

    fn answer(&mut self, question_id: &str, value: Option<ResponseValue>) -> Result<()> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| Error::NotFound(format!("question {}", question_id)))?;

        if question.kind.is_structural() {
            return Err(Error::InvalidTransition(format!(
                "{} question {} does not take an answer",
                question.kind.tag(),
                question_id
            )));
        }

        if let Err(err) = self.schema.validate_field(question_id, value.as_ref()) {
            if let Error::Validation { message, .. } = &err {
                self.errors.insert(question_id.to_string(), message.clone());
            }
            tracing::debug!(question_id, error = %err, "Answer rejected");
            return Err(err);
        }

        self.errors.remove(question_id);
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                self.responses.insert(question_id.to_string(), v);
            }
            None => {
                self.responses.remove(question_id);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        match self.position {
            WizardPosition::Welcome => {
                self.position = self.next_visible_from(self.first_step_index());
                self.direction = Direction::Forward;
                Ok(())
            }
            WizardPosition::Question(i) => {
                self.check_current(i)?;
                self.position = self.next_visible_from(i + 1);
                self.direction = Direction::Forward;
                Ok(())
            }
            WizardPosition::Submitting => Err(Error::InvalidTransition(
                "no questions remain; submit instead".to_string(),
            )),
            WizardPosition::Completed => Err(Error::InvalidTransition(
                "the wizard has already been completed".to_string(),
            )),
        }
    }

    fn previous(&mut self) {
        let target = match self.position {
            WizardPosition::Welcome | WizardPosition::Completed => None,
            WizardPosition::Question(i) => match self.prev_visible_before(i) {
                Some(p) => Some(WizardPosition::Question(p)),
                None if self.has_welcome => Some(WizardPosition::Welcome),
                None => None,
            },
            WizardPosition::Submitting => match self.last_visible() {
                Some(p) => Some(WizardPosition::Question(p)),
                None if self.has_welcome => Some(WizardPosition::Welcome),
                None => None,
            },
        };

        if let Some(position) = target {
            self.position = position;
            self.direction = Direction::Backward;
            if self.submission != SubmissionStatus::Idle {
                self.submission = SubmissionStatus::Idle;
            }
        }
    }

    fn begin_submit(&mut self) -> Result<()> {
        if let WizardPosition::Question(i) = self.position {
            if self.next_visible_from(i + 1) != WizardPosition::Submitting {
                return Err(Error::InvalidTransition(
                    "submit is only available from the last question".to_string(),
                ));
            }
            self.check_current(i)?;
            self.position = WizardPosition::Submitting;
            self.direction = Direction::Forward;
        }
        if self.position != WizardPosition::Submitting {
            return Err(Error::InvalidTransition(
                "submit is only available from the last question".to_string(),
            ));
        }

        let visible = self.visibility();
        let errors = self.schema.validate_all(&self.responses, |id| {
            self.questions
                .iter()
                .position(|q| q.id == id)
                .is_some_and(|i| visible[i])
        });
        let first = errors
            .first_key_value()
            .map(|(id, message)| Error::validation(id.clone(), message.clone()));
        if let Some(err) = first {
            self.errors = errors;
            return Err(err);
        }

        self.submission = SubmissionStatus::InFlight;
        Ok(())
    }

    /// Validate the answer recorded for question `i`.
    fn check_current(&mut self, i: usize) -> Result<()> {
        let question_id = self.questions[i].id.clone();
        match self
            .schema
            .validate_field(&question_id, self.responses.get(&question_id))
        {
            Ok(()) => {
                self.errors.remove(&question_id);
                Ok(())
            }
            Err(err) => {
                if let Error::Validation { message, .. } = &err {
                    self.errors.insert(question_id.clone(), message.clone());
                }
                Err(err)
            }
        }
    }

    /// Visibility of every question. Computed in order so that answers to
    /// hidden questions never make a later question visible.
    fn visibility(&self) -> Vec<bool> {
        let mut effective = Responses::new();
        self.questions
            .iter()
            .map(|q| {
                let visible = is_visible(q, &effective);
                if visible {
                    if let Some(v) = self.responses.get(&q.id) {
                        effective.insert(q.id.clone(), v.clone());
                    }
                }
                visible
            })
            .collect()
    }

    /// Index of the first question stepped through as `Question(i)`
    fn first_step_index(&self) -> usize {
        usize::from(self.has_welcome)
    }

    fn initial_position(&self) -> WizardPosition {
        if self.has_welcome {
            WizardPosition::Welcome
        } else {
            self.next_visible_from(0)
        }
    }

    fn next_visible_from(&self, start: usize) -> WizardPosition {
        let visible = self.visibility();
        (start.max(self.first_step_index())..self.questions.len())
            .find(|&i| visible[i])
            .map(WizardPosition::Question)
            .unwrap_or(WizardPosition::Submitting)
    }

    fn prev_visible_before(&self, index: usize) -> Option<usize> {
        let visible = self.visibility();
        (self.first_step_index()..index).rev().find(|&i| visible[i])
    }

    fn last_visible(&self) -> Option<usize> {
        self.prev_visible_before(self.questions.len())
    }

    /// Answers to currently visible, answerable questions
    pub fn submitted_responses(&self) -> Responses {
        let visible = self.visibility();
        self.questions
            .iter()
            .zip(visible)
            .filter(|(q, visible)| *visible && !q.kind.is_structural())
            .filter_map(|(q, _)| self.responses.get(&q.id).map(|v| (q.id.clone(), v.clone())))
            .collect()
    }

    /// Render the current step
    pub fn step(&self) -> Step {
        let visible = self.visibility();
        let steps: Vec<usize> = (self.first_step_index()..self.questions.len())
            .filter(|&i| visible[i])
            .collect();

        let (is_first, is_last, progress) = match self.position {
            WizardPosition::Welcome => (true, steps.is_empty(), 0.0),
            WizardPosition::Question(i) => {
                let before = steps.iter().filter(|&&s| s < i).count();
                (
                    before == 0 && !self.has_welcome,
                    steps.iter().all(|&s| s <= i),
                    before as f32 / steps.len().max(1) as f32,
                )
            }
            WizardPosition::Submitting | WizardPosition::Completed => (false, true, 1.0),
        };

        let question = self.current_question().cloned();
        let value = question
            .as_ref()
            .and_then(|q| self.responses.get(&q.id).cloned());
        let errors = match &question {
            Some(q) => self
                .errors
                .get(&q.id)
                .map(|m| BTreeMap::from([(q.id.clone(), m.clone())]))
                .unwrap_or_default(),
            None => self.errors.clone(),
        };

        Step {
            position: self.position,
            question,
            value,
            is_first,
            is_last,
            errors,
            direction: self.direction,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::ChoiceOption;
    use crate::visibility::{Condition, Predicate};

    fn long_text(id: &str, position: i32) -> Question {
        Question::new(id, "Anything else?", position, QuestionKind::LongText {
            placeholder: None,
            max_character_count: None,
        })
    }

    fn rating(id: &str, position: i32) -> Question {
        Question::new(id, "Rate your trip", position, QuestionKind::Rating { rating_scale: 5 })
            .required()
    }

    fn answer(state: &mut WizardState, id: &str, value: impl Into<ResponseValue>) -> Result<()> {
        state.reduce(WizardAction::Answer {
            question_id: id.to_string(),
            value: Some(value.into()),
        })
    }

    #[test]
    fn test_starts_at_first_question_without_welcome() {
        let state = WizardState::new(vec![long_text("q2", 2), rating("q1", 1)]);
        assert_eq!(state.position, WizardPosition::Question(0));
        assert_eq!(state.current_question().unwrap().id, "q1");
        let step = state.step();
        assert!(step.is_first);
        assert!(!step.is_last);
    }

    #[test]
    fn test_welcome_screen_when_first_question_is_welcome() {
        let welcome = Question::new("w", "Hi!", 0, QuestionKind::Welcome { body: None });
        let mut state = WizardState::new(vec![welcome, rating("q1", 1)]);
        assert_eq!(state.position, WizardPosition::Welcome);

        state.reduce(WizardAction::Next).unwrap();
        assert_eq!(state.position, WizardPosition::Question(1));
        assert!(!state.step().is_first);

        state.reduce(WizardAction::Previous).unwrap();
        assert_eq!(state.position, WizardPosition::Welcome);
        assert_eq!(state.direction, Direction::Backward);
    }

    #[test]
    fn test_required_blocks_next() {
        let mut state = WizardState::new(vec![rating("q1", 1), long_text("q2", 2)]);
        let err = state.reduce(WizardAction::Next).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(state.position, WizardPosition::Question(0));
        assert!(state.step().errors.contains_key("q1"));

        let err = state
            .reduce(WizardAction::Answer {
                question_id: "q1".into(),
                value: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        answer(&mut state, "q1", 4).unwrap();
        state.reduce(WizardAction::Next).unwrap();
        assert_eq!(state.position, WizardPosition::Question(1));
        assert!(state.errors.is_empty());
    }

    #[test]
    fn test_back_navigation_preserves_values() {
        let mut state = WizardState::new(vec![rating("q1", 1), long_text("q2", 2)]);
        answer(&mut state, "q1", 3).unwrap();
        state.reduce(WizardAction::Next).unwrap();
        answer(&mut state, "q2", "Loved the food").unwrap();

        state.reduce(WizardAction::Previous).unwrap();
        assert_eq!(state.step().value, Some(ResponseValue::Number(3.0)));

        state.reduce(WizardAction::Next).unwrap();
        assert_eq!(state.step().value, Some(ResponseValue::from("Loved the food")));
    }

    #[test]
    fn test_conditional_question_skipped_and_revealed() {
        let q1 = Question::new("q1", "Style", 1, QuestionKind::SingleChoice {
            options: vec![
                ChoiceOption::new("a", "Relaxing", "relax"),
                ChoiceOption::new("b", "Other", "other"),
            ],
        })
        .required();
        let q2 = long_text("q2", 2).shown_when(Condition::new("q1", Predicate::Equals {
            value: ResponseValue::from("other"),
        }));
        let q3 = Question::new("q3", "Again?", 3, QuestionKind::YesNo);
        let mut state = WizardState::new(vec![q1, q2, q3]);

        answer(&mut state, "q1", "relax").unwrap();
        state.reduce(WizardAction::Next).unwrap();
        assert_eq!(state.current_question().unwrap().id, "q3");

        state.reduce(WizardAction::Previous).unwrap();
        assert_eq!(state.current_question().unwrap().id, "q1");
        answer(&mut state, "q1", "other").unwrap();
        state.reduce(WizardAction::Next).unwrap();
        assert_eq!(state.current_question().unwrap().id, "q2");
    }

    #[test]
    fn test_hidden_answers_excluded_from_submission() {
        let q1 = Question::new("q1", "Again?", 1, QuestionKind::YesNo).required();
        let q2 = long_text("q2", 2).shown_when(Condition::new("q1", Predicate::Equals {
            value: ResponseValue::Bool(false),
        }));
        let mut state = WizardState::new(vec![q1, q2]);

        answer(&mut state, "q1", false).unwrap();
        state.reduce(WizardAction::Next).unwrap();
        answer(&mut state, "q2", "Too expensive").unwrap();
        state.reduce(WizardAction::Previous).unwrap();
        answer(&mut state, "q1", true).unwrap();

        let submitted = state.submitted_responses();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted["q1"], ResponseValue::Bool(true));
    }

    #[test]
    fn test_submit_flow_and_in_flight_conflict() {
        let mut state = WizardState::new(vec![rating("q1", 1)]);
        answer(&mut state, "q1", 5).unwrap();
        state.reduce(WizardAction::BeginSubmit).unwrap();
        assert_eq!(state.position, WizardPosition::Submitting);
        assert!(state.is_submitting());

        let err = state.reduce(WizardAction::BeginSubmit).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(matches!(
            state.reduce(WizardAction::Previous),
            Err(Error::Conflict(_))
        ));

        state
            .reduce(WizardAction::SubmitFailed("store offline".into()))
            .unwrap();
        assert_eq!(state.position, WizardPosition::Submitting);
        assert_eq!(state.responses.len(), 1);

        state.reduce(WizardAction::BeginSubmit).unwrap();
        state.reduce(WizardAction::SubmitSucceeded).unwrap();
        assert!(state.is_completed());
        assert!(matches!(
            state.reduce(WizardAction::Next),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_submit_only_from_last_question() {
        let mut state = WizardState::new(vec![rating("q1", 1), long_text("q2", 2)]);
        answer(&mut state, "q1", 2).unwrap();
        assert!(matches!(
            state.reduce(WizardAction::BeginSubmit),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_reset_is_reentrant() {
        let mut state = WizardState::new(vec![rating("q1", 1), long_text("q2", 2)]);
        answer(&mut state, "q1", 2).unwrap();
        state.reduce(WizardAction::Next).unwrap();
        state.reduce(WizardAction::Reset).unwrap();
        state.reduce(WizardAction::Reset).unwrap();
        assert!(state.responses.is_empty());
        assert_eq!(state.position, WizardPosition::Question(0));
    }

    #[test]
    fn test_restore_positions_at_first_unanswered() {
        let responses = Responses::from([("q1".to_string(), ResponseValue::Number(4.0))]);
        let state = WizardState::restore(vec![rating("q1", 1), long_text("q2", 2)], responses);
        assert_eq!(state.current_question().unwrap().id, "q2");
    }

    #[test]
    fn test_ties_broken_by_id() {
        let state = WizardState::new(vec![long_text("b", 1), long_text("a", 1)]);
        assert_eq!(state.current_question().unwrap().id, "a");
    }
}
