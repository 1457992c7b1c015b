//! Error types for jsonstore core.

use crate::constraint::ConstraintViolation;
use crate::types::TransactionId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in jsonstore core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persistence backend error (I/O, locking, decryption).
    #[error("storage error: {0}")]
    Storage(#[from] jsonstore_storage::StorageError),

    /// A record could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored stream is not a valid document.
    #[error("invalid document format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Nesting misuse: a second child, or work on a non-leaf transaction.
    #[error("invalid transaction state: {message}")]
    InvalidState {
        /// Description of why the operation is not allowed.
        message: String,
    },

    /// The transaction has already been committed or rolled back.
    #[error("transaction {id} is not active; it has been committed or rolled back")]
    InactiveTransaction {
        /// The detached transaction.
        id: TransactionId,
    },

    /// A commit failed its integrity check.
    #[error("constraint violation: {0}")]
    ConstraintViolation(ConstraintViolation),
}

impl CoreError {
    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an inactive transaction error.
    pub fn inactive(id: TransactionId) -> Self {
        Self::InactiveTransaction { id }
    }

    /// Returns the violated constraint if this is a constraint violation.
    #[must_use]
    pub fn as_constraint_violation(&self) -> Option<&ConstraintViolation> {
        match self {
            Self::ConstraintViolation(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<ConstraintViolation> for CoreError {
    fn from(violation: ConstraintViolation) -> Self {
        Self::ConstraintViolation(violation)
    }
}
