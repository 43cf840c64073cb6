//! Survey service
//!
//! The façade callers drive: form lifecycle, response sessions, the wizard
//! for each live session, submission and analytics.
//!
//! Live sessions are kept in memory behind one mutex and reloaded from the
//! record store on demand, so a session can be resumed by token after a
//! restart. The lock is never held across an await: `submit` marks the
//! wizard in flight, releases the lock while the store write runs on a
//! blocking task, then re-acquires it to record the outcome.

use crate::analytics::{AnalyticsEngine, FormAnalytics};
use crate::config::Config;
use crate::definition::FormDefinition;
use crate::error::{Error, Result};
use crate::milestone::{MilestoneCursor, MilestoneOutcome, MilestonePlan};
use crate::store::records;
use crate::store::{Collection, RecordStore};
use crate::types::{Form, FormStatus, Response, ResponseSession, ResponseValue, Responses, SessionStatus};
use crate::wizard::{Direction, Step, WizardAction, WizardPosition, WizardState};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Service tunables
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Lifetime of a response session from the moment it is opened
    pub session_ttl: Duration,
    /// Rounding applied to analytics means and percentages
    pub decimal_places: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(72),
            decimal_places: 1,
        }
    }
}

impl From<&Config> for ServiceConfig {
    fn from(config: &Config) -> Self {
        Self {
            session_ttl: Duration::hours(i64::from(config.sessions.ttl_hours)),
            decimal_places: config.analytics.decimal_places,
        }
    }
}

/// Returned once when a session is opened. The token is not stored and
/// cannot be recovered.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub ok: bool,
    /// Field-level message when the answer was rejected
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub session_id: String,
    pub status: SessionStatus,
    /// Responses written by this submission
    pub saved: usize,
    /// Present for multi-milestone forms
    pub milestone: Option<MilestoneOutcome>,
    /// The form's completion message, once the session is completed
    pub completion_message: Option<String>,
}

/// SHA-256 of a resumption token, hex encoded
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory state of one session
struct LiveSession {
    session: ResponseSession,
    form: Form,
    plan: MilestonePlan,
    cursor: MilestoneCursor,
    wizard: WizardState,
    /// Question id → rank across the whole form, for tracking the furthest answer
    ranks: HashMap<String, usize>,
}

impl LiveSession {
    fn new(form: Form, session: ResponseSession, plan: MilestonePlan, stored: &Responses) -> Self {
        let cursor = MilestoneCursor::from_session(&session);
        let ranks = (0..plan.len())
            .filter_map(|i| plan.get(i))
            .flat_map(|m| m.questions.iter())
            .enumerate()
            .map(|(rank, q)| (q.id.clone(), rank))
            .collect();
        let mut wizard = wizard_for(&plan, &cursor, stored);
        if session.status == SessionStatus::Completed {
            wizard.position = WizardPosition::Completed;
        }
        Self {
            session,
            form,
            plan,
            cursor,
            wizard,
            ranks,
        }
    }

    fn is_further(&self, question_id: &str) -> bool {
        let rank = |id: &str| self.ranks.get(id).copied();
        match &self.session.last_question_id {
            None => true,
            Some(last) => rank(question_id) > rank(last),
        }
    }
}

/// Wizard over the cursor's current milestone, restored from stored answers
fn wizard_for(plan: &MilestonePlan, cursor: &MilestoneCursor, stored: &Responses) -> WizardState {
    let questions = plan
        .get(cursor.current)
        .map(|m| m.questions.clone())
        .unwrap_or_default();
    let restored: Responses = questions
        .iter()
        .filter_map(|q| stored.get(&q.id).map(|v| (q.id.clone(), v.clone())))
        .collect();
    if restored.is_empty() {
        WizardState::new(questions)
    } else {
        WizardState::restore(questions, restored)
    }
}

/// Snapshot taken when a submission starts
#[derive(Debug, Clone)]
struct PendingSubmit {
    /// Session as it will be stored on success
    session: ResponseSession,
    cursor: MilestoneCursor,
    outcome: MilestoneOutcome,
    responses: Responses,
}

/// Write one submission. Every write is an upsert keyed by a deterministic
/// id, so re-running after a partial failure never duplicates responses.
///
/// A stored session that has already reached a terminal status is never
/// overwritten with an earlier one.
fn persist(store: &dyn RecordStore, pending: &PendingSubmit) -> Result<()> {
    let next = pending.session.status;
    if let Some(stored) = records::get_session(store, &pending.session.id)? {
        if stored.status != next && !stored.status.can_transition_to(next) {
            return Err(match stored.status {
                SessionStatus::Expired => Error::ExpiredSession(stored.id),
                other => Error::InvalidTransition(format!(
                    "session {} is already {}",
                    stored.id,
                    other.as_str()
                )),
            });
        }
    }

    for (question_id, value) in &pending.responses {
        let response = Response::new(&pending.session, question_id, value.clone());
        records::upsert(store, Collection::Responses, &response)?;
    }
    records::upsert(store, Collection::Sessions, &pending.session)?;
    Ok(())
}

pub struct SurveyService {
    store: Arc<dyn RecordStore>,
    config: ServiceConfig,
    analytics: AnalyticsEngine,
    live: Mutex<HashMap<String, LiveSession>>,
}

impl SurveyService {
    pub fn new(store: Arc<dyn RecordStore>, config: ServiceConfig) -> Self {
        let analytics = AnalyticsEngine::new(config.decimal_places);
        Self {
            store,
            config,
            analytics,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    fn lock_live(&self) -> MutexGuard<'_, HashMap<String, LiveSession>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Forms
    // ============================================

    /// Validate a definition and store its form and questions
    pub fn create_form(&self, definition: FormDefinition) -> Result<Form> {
        let (form, questions) = definition.into_records()?;

        self.store
            .insert(Collection::Forms, &records::to_record(&form)?)?;
        for question in &questions {
            records::insert_question(self.store(), question)?;
        }

        tracing::info!(
            form_id = %form.id,
            questions = questions.len(),
            milestones = form.milestones.len(),
            "Created form"
        );
        Ok(form)
    }

    pub fn publish_form(&self, form_id: &str) -> Result<Form> {
        self.transition_form(form_id, FormStatus::Active)
    }

    pub fn archive_form(&self, form_id: &str) -> Result<Form> {
        self.transition_form(form_id, FormStatus::Archived)
    }

    fn transition_form(&self, form_id: &str, next: FormStatus) -> Result<Form> {
        let mut form = records::require_form(self.store(), form_id)?;
        form.transition(next)?;
        self.store.update(
            Collection::Forms,
            form_id,
            &json!({ "status": form.status, "updated_at": form.updated_at }),
        )?;
        tracing::info!(form_id, status = form.status.as_str(), "Form status changed");
        Ok(form)
    }

    pub fn list_forms(&self) -> Result<Vec<Form>> {
        records::list_forms(self.store())
    }

    pub fn form_questions(&self, form_id: &str) -> Result<Vec<crate::question::Question>> {
        records::require_form(self.store(), form_id)?;
        records::form_questions(self.store(), form_id)
    }

    // ============================================
    // Sessions
    // ============================================

    /// Start a response session on an active form
    pub fn open_session(&self, form_id: &str) -> Result<SessionHandle> {
        let form = records::require_form(self.store(), form_id)?;
        if form.status != FormStatus::Active {
            return Err(Error::InvalidTransition(format!(
                "form {} is {}, not accepting responses",
                form.id,
                form.status.as_str()
            )));
        }
        let questions = records::form_questions(self.store(), &form.id)?;
        let plan = MilestonePlan::new(&form, &questions);

        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let session = ResponseSession {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form.id.clone(),
            token_hash: hash_token(&token),
            status: SessionStatus::Active,
            current_milestone: 0,
            completed_milestones: Vec::new(),
            created_at: now,
            expires_at: now + self.config.session_ttl,
            completed_at: None,
            last_question_id: None,
        };
        self.store
            .insert(Collection::Sessions, &records::to_record(&session)?)?;

        let session_id = session.id.clone();
        tracing::info!(form_id, session_id = %session_id, "Opened response session");

        let live = LiveSession::new(form, session, plan, &Responses::new());
        self.lock_live().insert(session_id.clone(), live);

        Ok(SessionHandle { session_id, token })
    }

    /// Find the session a token belongs to and reload its wizard
    pub fn resume(&self, token: &str) -> Result<String> {
        let session = records::find_session_by_token_hash(self.store(), &hash_token(token))?
            .ok_or_else(|| Error::NotFound("no session for this token".to_string()))?;

        self.with_live(&session.id, |live| {
            if live.session.status == SessionStatus::Completed {
                return Err(Error::InvalidTransition(format!(
                    "session {} is already completed",
                    live.session.id
                )));
            }
            tracing::info!(session_id = %live.session.id, "Resumed response session");
            Ok(live.session.id.clone())
        })
    }

    /// Current stored view of a session
    pub fn session(&self, session_id: &str) -> Result<ResponseSession> {
        self.with_live(session_id, |live| Ok(live.session.clone()))
    }

    /// Run `f` on a live session, loading it from the store if needed.
    /// Expired sessions are evicted and rejected, unless a submission is in
    /// flight: that submission decides the session's fate.
    ///
    /// Store reads and writes happen outside the session map lock.
    fn with_live<T>(&self, session_id: &str, f: impl FnOnce(&mut LiveSession) -> Result<T>) -> Result<T> {
        let cached = self.lock_live().contains_key(session_id);
        let loaded = if cached {
            None
        } else {
            Some(self.load_live(session_id)?)
        };

        let mut live = self.lock_live();
        if let Some(loaded) = loaded {
            // Another caller may have loaded it meanwhile; keep theirs
            live.entry(session_id.to_string()).or_insert(loaded);
        }
        let entry = live
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        let expired = !entry.wizard.is_submitting()
            && entry.session.effective_status(Utc::now()) == SessionStatus::Expired;
        if !expired {
            return f(entry);
        }

        let newly_expired = entry.session.status == SessionStatus::Active;
        live.remove(session_id);
        drop(live);

        if newly_expired {
            self.mark_expired(session_id)?;
        }
        Err(Error::ExpiredSession(session_id.to_string()))
    }

    fn load_live(&self, session_id: &str) -> Result<LiveSession> {
        let session = records::require_session(self.store(), session_id)?;
        let form = records::require_form(self.store(), &session.form_id)?;
        let questions = records::form_questions(self.store(), &form.id)?;
        let plan = MilestonePlan::new(&form, &questions);
        let stored: Responses = records::session_responses(self.store(), session_id)?
            .into_iter()
            .map(|r| (r.question_id, r.value))
            .collect();

        tracing::debug!(session_id, responses = stored.len(), "Loaded session from store");
        Ok(LiveSession::new(form, session, plan, &stored))
    }

    /// Record an active session as expired in the store
    fn mark_expired(&self, session_id: &str) -> Result<()> {
        let stored = records::require_session(self.store(), session_id)?;
        if stored.status.can_transition_to(SessionStatus::Expired) {
            self.store.update(
                Collection::Sessions,
                session_id,
                &json!({ "status": SessionStatus::Expired }),
            )?;
            tracing::info!(session_id, "Session expired");
        }
        Ok(())
    }

    // ============================================
    // Wizard
    // ============================================

    pub fn render_step(&self, session_id: &str) -> Result<Step> {
        self.with_live(session_id, |live| Ok(live.wizard.step()))
    }

    /// Record one answer. A rejected value is reported in the outcome rather
    /// than as an error so callers can show it next to the question.
    pub fn answer(
        &self,
        session_id: &str,
        question_id: &str,
        value: Option<ResponseValue>,
    ) -> Result<AnswerOutcome> {
        self.with_live(session_id, |live| {
            let answered = value.as_ref().is_some_and(|v| !v.is_empty());
            match live.wizard.reduce(WizardAction::Answer {
                question_id: question_id.to_string(),
                value,
            }) {
                Ok(()) => {}
                Err(Error::Validation { message, .. }) => {
                    return Ok(AnswerOutcome {
                        ok: false,
                        error: Some(message),
                    })
                }
                Err(e) => return Err(e),
            }

            if answered && live.is_further(question_id) {
                live.session.last_question_id = Some(question_id.to_string());
                if let Err(e) = self.store.update(
                    Collection::Sessions,
                    &live.session.id,
                    &json!({ "last_question_id": question_id }),
                ) {
                    tracing::warn!(session_id = %live.session.id, error = %e, "Failed to record progress");
                }
            }

            Ok(AnswerOutcome {
                ok: true,
                error: None,
            })
        })
    }

    pub fn navigate(&self, session_id: &str, direction: Direction) -> Result<Step> {
        self.with_live(session_id, |live| {
            match direction {
                Direction::Forward => live.wizard.reduce(WizardAction::Next)?,
                Direction::Backward => live.wizard.reduce(WizardAction::Previous)?,
                Direction::None => {}
            }
            Ok(live.wizard.step())
        })
    }

    /// Discard the in-memory wizard. Calling it again is harmless.
    pub fn cancel(&self, session_id: &str) -> Result<()> {
        let mut live = self.lock_live();
        if let Some(entry) = live.get_mut(session_id) {
            entry.wizard.reduce(WizardAction::Reset)?;
            live.remove(session_id);
            tracing::debug!(session_id, "Cancelled session wizard");
        }
        Ok(())
    }

    // ============================================
    // Submission and milestones
    // ============================================

    /// Persist the current milestone's answers.
    ///
    /// A second call while one is in flight fails with `Conflict`. A store
    /// failure leaves the wizard in `Submitting` with its answers intact and
    /// is reported as `Persistence`; calling `submit` again retries.
    pub async fn submit(&self, session_id: &str) -> Result<SubmitOutcome> {
        let pending = self.prepare_submit(session_id)?;

        let store = Arc::clone(&self.store);
        let job = pending.clone();
        let result = tokio::task::spawn_blocking(move || persist(store.as_ref(), &job))
            .await
            .unwrap_or_else(|e| Err(Error::Persistence(format!("submit task failed: {}", e))));

        self.finish_submit(session_id, pending, result)
    }

    fn prepare_submit(&self, session_id: &str) -> Result<PendingSubmit> {
        self.with_live(session_id, |live| {
            if live.session.status == SessionStatus::Completed {
                return Err(Error::InvalidTransition(format!(
                    "session {} is already completed",
                    live.session.id
                )));
            }
            live.wizard.reduce(WizardAction::BeginSubmit)?;

            let mut cursor = live.cursor.clone();
            let outcome = match cursor.complete(&live.plan) {
                Ok(outcome) => outcome,
                Err(e) => {
                    live.wizard.reduce(WizardAction::SubmitFailed(e.to_string()))?;
                    return Err(e);
                }
            };

            let mut session = live.session.clone();
            cursor.apply_to(&mut session);
            if outcome.done {
                session.status = SessionStatus::Completed;
                session.completed_at = Some(Utc::now());
            }

            Ok(PendingSubmit {
                session,
                cursor,
                outcome,
                responses: live.wizard.submitted_responses(),
            })
        })
    }

    fn finish_submit(
        &self,
        session_id: &str,
        pending: PendingSubmit,
        result: Result<()>,
    ) -> Result<SubmitOutcome> {
        let mut sessions = self.lock_live();
        let live = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        if let Err(e) = result {
            let message = match &e {
                Error::Persistence(message) => message.clone(),
                other => other.to_string(),
            };
            live.wizard
                .reduce(WizardAction::SubmitFailed(message.clone()))?;
            tracing::warn!(session_id, error = %message, "Submission failed");
            return Err(match e {
                Error::ExpiredSession(_) | Error::InvalidTransition(_) => e,
                _ => Error::Persistence(message),
            });
        }

        live.wizard.reduce(WizardAction::SubmitSucceeded)?;
        let saved = pending.responses.len();
        live.session = pending.session;
        live.cursor = pending.cursor;
        if !pending.outcome.done {
            live.wizard = wizard_for(&live.plan, &live.cursor, &Responses::new());
        }

        tracing::info!(
            session_id,
            saved,
            status = live.session.status.as_str(),
            "Submission stored"
        );

        Ok(SubmitOutcome {
            session_id: session_id.to_string(),
            status: live.session.status,
            saved,
            milestone: live.form.is_multi_milestone().then(|| pending.outcome.clone()),
            completion_message: if pending.outcome.done {
                live.form.completion_message.clone()
            } else {
                None
            },
        })
    }

    /// Enter a milestone by name, discarding unsubmitted answers of the
    /// current one.
    pub fn begin_milestone(&self, session_id: &str, name: &str) -> Result<Step> {
        self.with_live(session_id, |live| {
            if live.wizard.is_submitting() {
                return Err(Error::Conflict("a submission is already in flight".to_string()));
            }
            if live.session.status == SessionStatus::Completed {
                return Err(Error::InvalidTransition(format!(
                    "session {} is already completed",
                    live.session.id
                )));
            }

            let mut cursor = live.cursor.clone();
            let index = cursor.begin(&live.plan, name)?;
            if index != live.cursor.current {
                self.store.update(
                    Collection::Sessions,
                    &live.session.id,
                    &json!({ "current_milestone": index }),
                )?;
                live.session.current_milestone = index;
                live.cursor = cursor;
                live.wizard = wizard_for(&live.plan, &live.cursor, &Responses::new());
                tracing::info!(session_id = %live.session.id, milestone = name, "Entered milestone");
            }
            Ok(live.wizard.step())
        })
    }

    /// Complete the current milestone synchronously: same rules and effects
    /// as [`SurveyService::submit`], with the write on the calling thread.
    pub fn complete_milestone(&self, session_id: &str) -> Result<MilestoneOutcome> {
        let pending = self.prepare_submit(session_id)?;
        let result = persist(self.store(), &pending);
        let outcome = pending.outcome.clone();
        self.finish_submit(session_id, pending, result)?;
        Ok(outcome)
    }

    // ============================================
    // Analytics
    // ============================================

    pub fn get_analytics(&self, form_id: &str) -> Result<FormAnalytics> {
        self.analytics.compute(self.store(), form_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::definition::FormSpec;
    use crate::question::{Question, QuestionKind};
    use crate::types::DisplayOptions;

    fn service() -> SurveyService {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        SurveyService::new(Arc::new(db), ServiceConfig::default())
    }

    fn poll() -> FormDefinition {
        FormDefinition {
            form: FormSpec {
                id: Some("poll".into()),
                title: "Quick poll".into(),
                description: None,
                display: DisplayOptions::default(),
                completion_message: Some("Thanks!".into()),
                milestones: vec![],
            },
            questions: vec![Question::new("q1", "Again?", 1, QuestionKind::YesNo).required()],
        }
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
    }

    #[test]
    fn test_sessions_require_active_form() {
        let service = service();
        service.create_form(poll()).unwrap();
        assert!(matches!(
            service.open_session("poll"),
            Err(Error::InvalidTransition(_))
        ));

        service.publish_form("poll").unwrap();
        assert!(service.open_session("poll").is_ok());

        service.archive_form("poll").unwrap();
        assert!(service.open_session("poll").is_err());
        assert!(matches!(
            service.publish_form("poll"),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_duplicate_form_id_conflicts() {
        let service = service();
        service.create_form(poll()).unwrap();
        assert!(matches!(service.create_form(poll()), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_token_not_stored_in_plain_text() {
        let service = service();
        service.create_form(poll()).unwrap();
        service.publish_form("poll").unwrap();
        let handle = service.open_session("poll").unwrap();

        let record = service
            .store()
            .get(Collection::Sessions, &handle.session_id)
            .unwrap()
            .unwrap();
        assert!(!record.to_string().contains(&handle.token));
        assert_eq!(record["token_hash"], hash_token(&handle.token));
    }

    fn answered_poll_session(service: &SurveyService) -> String {
        service.create_form(poll()).unwrap();
        service.publish_form("poll").unwrap();
        let id = service.open_session("poll").unwrap().session_id;
        service.answer(&id, "q1", Some(true.into())).unwrap();
        id
    }

    #[test]
    fn test_expiry_waits_for_in_flight_submit() {
        let service = service();
        let id = answered_poll_session(&service);

        let pending = service.prepare_submit(&id).unwrap();
        // The deadline passes while the write is running
        service.lock_live().get_mut(&id).unwrap().session.expires_at =
            Utc::now() - Duration::seconds(1);

        assert!(service.render_step(&id).is_ok());
        assert_eq!(
            records::require_session(service.store(), &id).unwrap().status,
            SessionStatus::Active
        );

        let result = persist(service.store(), &pending);
        let outcome = service.finish_submit(&id, pending, result).unwrap();
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(
            records::require_session(service.store(), &id).unwrap().status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn test_persist_never_reverts_terminal_status() {
        let service = service();
        let id = answered_poll_session(&service);
        let pending = service.prepare_submit(&id).unwrap();

        service
            .store()
            .update(Collection::Sessions, &id, &json!({ "status": "expired" }))
            .unwrap();

        let result = persist(service.store(), &pending);
        assert!(matches!(result, Err(Error::ExpiredSession(_))));
        assert!(records::session_responses(service.store(), &id)
            .unwrap()
            .is_empty());
        assert_eq!(
            records::require_session(service.store(), &id).unwrap().status,
            SessionStatus::Expired
        );

        let err = service.finish_submit(&id, pending, result).unwrap_err();
        assert!(matches!(err, Error::ExpiredSession(_)));
        assert!(matches!(service.render_step(&id), Err(Error::ExpiredSession(_))));
    }

    #[test]
    fn test_concurrent_loads_share_one_live_session() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(db);
        let first = SurveyService::new(Arc::clone(&store), ServiceConfig::default());
        let id = answered_poll_session(&first);

        // A second service starts with nothing in memory
        let second = SurveyService::new(store, ServiceConfig::default());
        std::thread::scope(|scope| {
            let a = scope.spawn(|| second.render_step(&id));
            let b = scope.spawn(|| second.render_step(&id));
            assert!(a.join().unwrap().is_ok());
            assert!(b.join().unwrap().is_ok());
        });
        assert_eq!(second.lock_live().len(), 1);
        second.answer(&id, "q1", Some(false.into())).unwrap();
        assert_eq!(
            second.render_step(&id).unwrap().value,
            Some(ResponseValue::Bool(false))
        );
    }

    #[test]
    fn test_complete_milestone_completes_single_segment_form() {
        let service = service();
        service.create_form(poll()).unwrap();
        service.publish_form("poll").unwrap();
        let handle = service.open_session("poll").unwrap();

        service
            .answer(&handle.session_id, "q1", Some(true.into()))
            .unwrap();
        let outcome = service.complete_milestone(&handle.session_id).unwrap();
        assert!(outcome.done);
        assert_eq!(
            service.session(&handle.session_id).unwrap().status,
            SessionStatus::Completed
        );
        assert!(matches!(
            service.answer(&handle.session_id, "q1", Some(false.into())),
            Err(Error::InvalidTransition(_))
        ));
    }
}
