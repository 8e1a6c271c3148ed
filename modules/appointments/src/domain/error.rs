use thiserror::Error;

/// Domain-specific errors using thiserror.
///
/// "No match" is not an error: operations report it through their result
/// value (`false`, `None`, an empty list).
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("Stored document is not an appointment: {message}")]
    CorruptDocument { message: String },
}

impl DomainError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corrupt_document(message: impl Into<String>) -> Self {
        Self::CorruptDocument {
            message: message.into(),
        }
    }
}
