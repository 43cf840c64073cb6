//! Milestone session model
//!
//! A multi-milestone form splits its questions into named, ordered segments.
//! Each segment runs as its own wizard pass; the session remembers which
//! segment is current and which are done. Single-segment forms get a plan
//! with one implicit milestone holding every question.

use crate::error::{Error, Result};
use crate::question::{sort_questions, Question};
use crate::types::{Form, ResponseSession};
use serde::Serialize;

/// Name of the implicit milestone of a single-segment form
pub const DEFAULT_MILESTONE: &str = "main";

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub name: String,
    /// Questions of this milestone in display order
    pub questions: Vec<Question>,
}

/// Ordered milestones of one form
#[derive(Debug, Clone, PartialEq)]
pub struct MilestonePlan {
    milestones: Vec<Milestone>,
}

impl MilestonePlan {
    pub fn new(form: &Form, questions: &[Question]) -> Self {
        let mut milestones: Vec<Milestone> = if form.is_multi_milestone() {
            form.milestones
                .iter()
                .map(|name| Milestone {
                    name: name.clone(),
                    questions: questions
                        .iter()
                        .filter(|q| q.milestone.as_deref() == Some(name.as_str()))
                        .cloned()
                        .collect(),
                })
                .collect()
        } else {
            vec![Milestone {
                name: DEFAULT_MILESTONE.to_string(),
                questions: questions.to_vec(),
            }]
        };

        for milestone in &mut milestones {
            sort_questions(&mut milestone.questions);
        }
        Self { milestones }
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Milestone> {
        self.milestones.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.milestones.iter().position(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.milestones.iter().map(|m| m.name.as_str())
    }
}

/// Result of completing a milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneOutcome {
    /// Every milestone is now complete
    pub done: bool,
    pub next_milestone: Option<String>,
}

/// Where a session is within a [`MilestonePlan`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MilestoneCursor {
    pub current: usize,
    pub completed: Vec<String>,
}

impl MilestoneCursor {
    pub fn from_session(session: &ResponseSession) -> Self {
        Self {
            current: session.current_milestone,
            completed: session.completed_milestones.clone(),
        }
    }

    /// Write the cursor back into a session record
    pub fn apply_to(&self, session: &mut ResponseSession) {
        session.current_milestone = self.current;
        session.completed_milestones = self.completed.clone();
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.iter().any(|c| c == name)
    }

    pub fn is_done(&self, plan: &MilestonePlan) -> bool {
        plan.names().all(|name| self.is_completed(name))
    }

    /// Enter milestone `name`. Milestones may be entered out of order but
    /// never re-entered once completed.
    pub fn begin(&mut self, plan: &MilestonePlan, name: &str) -> Result<usize> {
        let index = plan
            .index_of(name)
            .ok_or_else(|| Error::NotFound(format!("milestone {}", name)))?;
        if self.is_completed(name) {
            return Err(Error::InvalidTransition(format!(
                "milestone {} is already completed",
                name
            )));
        }
        self.current = index;
        Ok(index)
    }

    /// Mark the current milestone completed and move to the next uncompleted
    /// one in plan order.
    pub fn complete(&mut self, plan: &MilestonePlan) -> Result<MilestoneOutcome> {
        let milestone = plan.get(self.current).ok_or_else(|| {
            Error::InvalidTransition(format!("no milestone at index {}", self.current))
        })?;
        if self.is_completed(&milestone.name) {
            return Err(Error::InvalidTransition(format!(
                "milestone {} is already completed",
                milestone.name
            )));
        }
        self.completed.push(milestone.name.clone());

        let next = (self.current + 1..plan.len())
            .chain(0..self.current)
            .find(|&i| plan.get(i).is_some_and(|m| !self.is_completed(&m.name)));

        match next {
            Some(index) => {
                self.current = index;
                Ok(MilestoneOutcome {
                    done: false,
                    next_milestone: plan.get(index).map(|m| m.name.clone()),
                })
            }
            None => Ok(MilestoneOutcome {
                done: true,
                next_milestone: None,
            }),
        }
    }
}
