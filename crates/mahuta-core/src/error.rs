//! # Error Taxonomy
//!
//! A single error type shared by every Mahuta component. Backend adapters
//! convert their transport-specific failures into one of these kinds at the
//! trait boundary so the orchestration layer never sees a backend error type.
//!
//! | Kind         | Meaning                                   | Retry by caller |
//! |--------------|-------------------------------------------|-----------------|
//! | `Validation` | malformed or missing request field        | never           |
//! | `NotFound`   | document or content does not exist        | never           |
//! | `NoIndex`    | target index was never created            | after creation  |
//! | `Timeout`    | backend call exceeded its deadline        | yes             |
//! | `Connection` | backend unreachable at initialization     | fix config      |
//! | `Technical`  | any other backend-side failure            | maybe           |

use thiserror::Error;

/// Result alias used across the Mahuta crates.
pub type MahutaResult<T> = Result<T, MahutaError>;

/// Errors surfaced by storage, indexing, pinning and orchestration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MahutaError {
    /// A request object or one of its required fields is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced document or content is unknown to the backend.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target index has not been created.
    #[error("Index {0} does not exist. Please create one using the operation 'create_index'")]
    NoIndex(String),

    /// A backend call did not complete before its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The backend could not be reached while initializing.
    #[error("unable to connect to {backend}: {reason}")]
    Connection {
        /// Human-readable backend identifier, e.g. `ipfs node [localhost:5001]`.
        backend: String,
        /// Why the connection failed.
        reason: String,
    },

    /// Any other backend failure. `cause` is kept for server-side logs.
    #[error("{message}")]
    Technical {
        /// Top-level description safe to show to a caller.
        message: String,
        /// Underlying cause, rendered to a string.
        cause: Option<String>,
    },
}

impl MahutaError {
    /// Build a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a technical error wrapping an underlying cause.
    pub fn technical(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Technical {
            message: message.into(),
            cause: Some(cause.to_string()),
        }
    }

    /// Build a technical error with no further cause.
    pub fn technical_msg(message: impl Into<String>) -> Self {
        Self::Technical {
            message: message.into(),
            cause: None,
        }
    }

    /// Build a connection error.
    pub fn connection(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Connection {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors a caller may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Underlying cause of a technical error, for logging.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Technical { cause, .. } => cause.as_deref(),
            Self::Connection { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Reject a string field that is absent or blank.
pub fn reject_if_empty(field: &str, value: Option<&str>) -> Result<(), MahutaError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(MahutaError::Validation(format!("{field} shouldn't be empty"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_index_message_names_the_index() {
        let err = MahutaError::NoIndex("docs".into());
        assert_eq!(
            err.to_string(),
            "Index docs does not exist. Please create one using the operation 'create_index'"
        );
    }

    #[test]
    fn technical_display_hides_cause() {
        let err = MahutaError::technical("Error whilst reading content", "connection reset by peer");
        assert_eq!(err.to_string(), "Error whilst reading content");
        assert_eq!(err.cause(), Some("connection reset by peer"));
    }

    #[test]
    fn only_timeouts_are_transient() {
        assert!(MahutaError::Timeout("read".into()).is_transient());
        assert!(!MahutaError::NotFound("x".into()).is_transient());
        assert!(!MahutaError::technical_msg("boom").is_transient());
    }

    #[test]
    fn reject_if_empty_accepts_content() {
        assert!(reject_if_empty("index", Some("docs")).is_ok());
    }

    #[test]
    fn reject_if_empty_rejects_blank_and_absent() {
        assert!(matches!(
            reject_if_empty("index", Some("   ")),
            Err(MahutaError::Validation(m)) if m == "index shouldn't be empty"
        ));
        assert!(matches!(
            reject_if_empty("index", None),
            Err(MahutaError::Validation(_))
        ));
    }
}
