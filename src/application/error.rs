use thiserror::Error;

use crate::cache::MutationKind;

use super::backend::BackendError;

/// What a read or write against the backend can fail with, as the site sees it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// No authenticated handle for the current identity yet.
    #[error("backend connection is not ready")]
    NotReady,
    #[error("{what} not found")]
    NotFound { what: String },
    /// The caller lacks the capability the call requires.
    #[error("`{call}` requires administrator access")]
    Forbidden { call: &'static str },
    /// Transport failure or backend rejection.
    #[error("`{call}` failed: {message}")]
    Remote { call: &'static str, message: String },
}

impl SyncError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn forbidden(call: &'static str) -> Self {
        Self::Forbidden { call }
    }

    pub fn remote(call: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            call,
            message: message.into(),
        }
    }

    /// Attribute a backend failure to the call that produced it.
    pub fn from_backend(call: &'static str, error: BackendError) -> Self {
        match error {
            BackendError::NotFound(what) => Self::NotFound { what },
            BackendError::Unauthorized => Self::Forbidden { call },
            BackendError::Rejected(message) | BackendError::Transport(message) => {
                Self::Remote { call, message }
            }
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

/// A failed write. The cache is left exactly as it was.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to {action}: {source}")]
pub struct MutationError {
    pub kind: MutationKind,
    pub action: &'static str,
    #[source]
    pub source: SyncError,
}

impl MutationError {
    pub fn new(kind: MutationKind, source: SyncError) -> Self {
        Self {
            kind,
            action: kind.label(),
            source,
        }
    }
}
