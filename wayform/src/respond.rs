//! Non-interactive respondent: walks a session through the wizard using a
//! prepared answer file, one milestone at a time.

use std::path::Path;

use anyhow::{bail, Context, Result};
use wayform_core::{
    Direction, MilestoneOutcome, Responses, SessionStatus, SurveyService, WizardPosition,
};

pub struct RespondSummary {
    pub session_id: String,
    pub token: String,
    pub status: SessionStatus,
    pub saved: usize,
    pub milestones: Vec<MilestoneOutcome>,
    pub completion_message: Option<String>,
}

/// Read a JSON object of question id → answer value
pub fn load_answers(path: &Path) -> Result<Responses> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON object of answers", path.display()))
}

pub async fn run(service: &SurveyService, form_id: &str, answers: &Responses) -> Result<RespondSummary> {
    let handle = service.open_session(form_id)?;
    let session_id = handle.session_id.as_str();

    let mut saved = 0;
    let mut milestones = Vec::new();
    loop {
        fill_milestone(service, session_id, answers)?;

        let outcome = service.submit(session_id).await?;
        saved += outcome.saved;
        if let Some(milestone) = outcome.milestone {
            milestones.push(milestone);
        }
        if outcome.status == SessionStatus::Completed {
            return Ok(RespondSummary {
                session_id: outcome.session_id,
                token: handle.token,
                status: outcome.status,
                saved,
                milestones,
                completion_message: outcome.completion_message,
            });
        }
    }
}

/// Answer every visible question of the current milestone and stop on its
/// last step
fn fill_milestone(service: &SurveyService, session_id: &str, answers: &Responses) -> Result<()> {
    loop {
        let step = service.render_step(session_id)?;
        match step.position {
            WizardPosition::Welcome => {
                service.navigate(session_id, Direction::Forward)?;
            }
            WizardPosition::Question(_) => {
                if let Some(question) = step.question.as_ref().filter(|q| !q.kind.is_structural()) {
                    let value = answers.get(&question.id).cloned();
                    if value.is_some() {
                        let outcome = service.answer(session_id, &question.id, value)?;
                        if !outcome.ok {
                            bail!(
                                "answer to {} rejected: {}",
                                question.id,
                                outcome.error.unwrap_or_default()
                            );
                        }
                    }
                }
                // An answer can reveal a follow-up, so re-render before deciding
                if service.render_step(session_id)?.is_last {
                    return Ok(());
                }
                service
                    .navigate(session_id, Direction::Forward)
                    .context("answer file is missing a required answer")?;
            }
            WizardPosition::Submitting | WizardPosition::Completed => return Ok(()),
        }
    }
}

pub fn print_summary(summary: &RespondSummary) {
    for milestone in &summary.milestones {
        match &milestone.next_milestone {
            Some(next) => println!("Milestone complete, next: {}", next),
            None => println!("All milestones complete"),
        }
    }
    println!("Session: {}", summary.session_id);
    println!("Resume token: {}", summary.token);
    println!("Status: {}", summary.status.as_str());
    println!("Responses saved: {}", summary.saved);
    if let Some(message) = &summary.completion_message {
        println!();
        println!("{}", message);
    }
}
