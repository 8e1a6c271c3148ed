//! Response envelope normalizer.
//!
//! Maps executor outcomes onto the client-visible contract: flag operations
//! answer `{"result": bool}`, lists answer an array, find answers the record
//! or `{}`. Executor failures answer 400; everything else, including "no
//! match", answers 200. The store identity never leaves this module.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::error;

use crate::api::rest::dto::ResultFlag;
use crate::contract::model::{Document, INTERNAL_ID_FIELD};
use crate::domain::error::DomainError;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html";

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, content_type),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}

fn json(status: StatusCode, body: Value) -> Response {
    respond(status, JSON_CONTENT_TYPE, body.to_string())
}

pub fn html(body: String) -> Response {
    respond(StatusCode::OK, HTML_CONTENT_TYPE, body)
}

fn flag_body(result: bool) -> Value {
    serde_json::to_value(ResultFlag { result }).unwrap_or(Value::Null)
}

pub fn strip_internal_id(mut doc: Document) -> Document {
    doc.remove(INTERNAL_ID_FIELD);
    doc
}

fn log_failure(e: &DomainError) {
    error!(error = %e, "Appointment operation failed");
}

/// Insert, delete-by-id and replace. Not found and failure both read `false`.
pub fn flag(outcome: Result<bool, DomainError>) -> Response {
    match outcome {
        Ok(done) => json(StatusCode::OK, flag_body(done)),
        Err(e) => {
            log_failure(&e);
            json(StatusCode::BAD_REQUEST, flag_body(false))
        }
    }
}

/// Delete-all never fails at this layer; the executor already folded errors.
pub fn delete_all(done: bool) -> Response {
    json(StatusCode::OK, flag_body(done))
}

pub fn list(outcome: Result<Vec<Document>, DomainError>) -> Response {
    match outcome {
        Ok(docs) => json(
            StatusCode::OK,
            Value::Array(
                docs.into_iter()
                    .map(|d| Value::Object(strip_internal_id(d)))
                    .collect(),
            ),
        ),
        Err(e) => {
            log_failure(&e);
            json(StatusCode::BAD_REQUEST, Value::Array(Vec::new()))
        }
    }
}

pub fn single(outcome: Result<Option<Document>, DomainError>) -> Response {
    match outcome {
        Ok(found) => json(
            StatusCode::OK,
            Value::Object(found.map(strip_internal_id).unwrap_or_default()),
        ),
        Err(e) => {
            log_failure(&e);
            json(StatusCode::BAD_REQUEST, Value::Object(Document::new()))
        }
    }
}

/// Bare 400 for payloads that never reached the executor.
pub fn rejected() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}
