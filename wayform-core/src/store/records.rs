//! Typed access to store records
//!
//! Thin helpers converting between domain types and the JSON records a
//! [`RecordStore`] holds.

use super::{record_id, Collection, Filter, Order, RecordStore};
use crate::error::{Error, Result};
use crate::question::{sort_questions, Question};
use crate::types::{Form, Response, ResponseSession};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub fn to_record<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn from_record<T: DeserializeOwned>(record: Value) -> Result<T> {
    Ok(serde_json::from_value(record)?)
}

/// Insert `value`, or overwrite the stored record with the same id.
/// Returns the record as stored.
pub fn upsert<T: Serialize>(store: &dyn RecordStore, collection: Collection, value: &T) -> Result<Value> {
    let record = to_record(value)?;
    let id = record_id(&record)?;
    if store.get(collection, id)?.is_some() {
        store.update(collection, id, &record)
    } else {
        store.insert(collection, &record)
    }
}

pub fn get_typed<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    id: &str,
) -> Result<Option<T>> {
    store.get(collection, id)?.map(from_record).transpose()
}

fn find_typed<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &Filter,
    order: Option<&Order>,
) -> Result<Vec<T>> {
    store
        .find(collection, filter, order)?
        .into_iter()
        .map(from_record)
        .collect()
}

// ============================================
// Forms and questions
// ============================================

pub fn get_form(store: &dyn RecordStore, id: &str) -> Result<Option<Form>> {
    get_typed(store, Collection::Forms, id)
}

/// Like [`get_form`] but a missing form is an error
pub fn require_form(store: &dyn RecordStore, id: &str) -> Result<Form> {
    get_form(store, id)?.ok_or_else(|| Error::NotFound(format!("form {}", id)))
}

pub fn list_forms(store: &dyn RecordStore) -> Result<Vec<Form>> {
    find_typed(store, Collection::Forms, &Filter::new(), Some(&Order::asc("created_at")))
}

/// Store key of a question. Question ids are only unique within their form.
pub fn question_record_id(form_id: &str, question_id: &str) -> String {
    format!("{}:{}", form_id, question_id)
}

pub fn insert_question(store: &dyn RecordStore, question: &Question) -> Result<()> {
    let mut record = to_record(question)?;
    if let Some(fields) = record.as_object_mut() {
        fields.insert(
            "id".to_string(),
            Value::String(question_record_id(&question.form_id, &question.id)),
        );
        fields.insert("question_id".to_string(), Value::String(question.id.clone()));
    }
    store.insert(Collection::Questions, &record)?;
    Ok(())
}

fn question_from_record(mut record: Value) -> Result<Question> {
    if let Some(fields) = record.as_object_mut() {
        if let Some(question_id) = fields.remove("question_id") {
            fields.insert("id".to_string(), question_id);
        }
    }
    from_record(record)
}

/// Questions of a form in display order
pub fn form_questions(store: &dyn RecordStore, form_id: &str) -> Result<Vec<Question>> {
    let mut questions = store
        .find(
            Collection::Questions,
            &Filter::new().eq("form_id", form_id),
            Some(&Order::asc("position")),
        )?
        .into_iter()
        .map(question_from_record)
        .collect::<Result<Vec<_>>>()?;
    sort_questions(&mut questions);
    Ok(questions)
}

// ============================================
// Sessions and responses
// ============================================

pub fn get_session(store: &dyn RecordStore, id: &str) -> Result<Option<ResponseSession>> {
    get_typed(store, Collection::Sessions, id)
}

pub fn require_session(store: &dyn RecordStore, id: &str) -> Result<ResponseSession> {
    get_session(store, id)?.ok_or_else(|| Error::NotFound(format!("session {}", id)))
}

pub fn find_session_by_token_hash(
    store: &dyn RecordStore,
    token_hash: &str,
) -> Result<Option<ResponseSession>> {
    let sessions: Vec<ResponseSession> = find_typed(
        store,
        Collection::Sessions,
        &Filter::new().eq("token_hash", token_hash),
        None,
    )?;
    Ok(sessions.into_iter().next())
}

pub fn form_sessions(store: &dyn RecordStore, form_id: &str) -> Result<Vec<ResponseSession>> {
    find_typed(
        store,
        Collection::Sessions,
        &Filter::new().eq("form_id", form_id),
        Some(&Order::asc("created_at")),
    )
}

pub fn form_responses(store: &dyn RecordStore, form_id: &str) -> Result<Vec<Response>> {
    find_typed(
        store,
        Collection::Responses,
        &Filter::new().eq("form_id", form_id),
        Some(&Order::asc("answered_at")),
    )
}

pub fn session_responses(store: &dyn RecordStore, session_id: &str) -> Result<Vec<Response>> {
    find_typed(
        store,
        Collection::Responses,
        &Filter::new().eq("session_id", session_id),
        Some(&Order::asc("answered_at")),
    )
}
