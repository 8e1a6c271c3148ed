use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of the id-keyed routes: `{"id": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// Body of `findAppointmentsInRange`: inclusive epoch-ms bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeRequest {
    pub start: i64,
    pub end: i64,
}

/// Response of every flag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFlag {
    pub result: bool,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode a request DTO from the raw body. Extra keys are ignored; missing or
/// mistyped keys are not.
pub fn decode_request<T: DeserializeOwned>(raw: &[u8]) -> Result<T, RequestError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(RequestError::EmptyBody);
    }
    Ok(serde_json::from_slice(raw)?)
}
