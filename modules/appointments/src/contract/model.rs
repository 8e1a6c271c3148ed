use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: the record's fields plus the store-owned identity.
pub type Document = Map<String, Value>;

/// Name of the identity field owned by the document store. Never sent to clients.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Booking state of an appointment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Available,
    Booked,
}

impl AppointmentStatus {
    /// Wire literal, as stored in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Booked => "BOOKED",
        }
    }
}

/// Appointment record. `id` is the caller-assigned business key, not the
/// store identity. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Appointment {
    pub id: String,
    pub created_time: i64,
    pub appointment_date: i64,
    pub appointment_duration: i64,
    pub doctor_name: String,
    pub status: AppointmentStatus,
    pub price: f64,
}

#[derive(Error, Debug)]
#[error("payload is not an appointment: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

impl Appointment {
    /// Decode a raw JSON payload. Every field is required and `status` must
    /// be one of the known literals; anything else rejects the whole record.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn encode(&self) -> String {
        // Plain struct of strings and numbers, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }

    /// Rebuild a record from a stored document, ignoring the store identity.
    pub fn from_document(mut doc: Document) -> Result<Self, DecodeError> {
        doc.remove(INTERNAL_ID_FIELD);
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}
