use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone)]
pub enum AppointmentsError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl AppointmentsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for AppointmentsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            Storage { .. } => Self::internal(),
            CorruptDocument { .. } => Self::internal(),
        }
    }
}

impl From<crate::contract::model::DecodeError> for AppointmentsError {
    fn from(e: crate::contract::model::DecodeError) -> Self {
        Self::validation(e.to_string())
    }
}
