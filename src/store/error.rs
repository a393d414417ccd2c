//! Backend error types
//!
//! Every backend failure carries an [`ErrorKind`] so callers can classify it
//! without matching on message text.

use std::fmt;
use thiserror::Error;

/// Classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An identity with this email already exists
    EmailAlreadyInUse,
    /// The email address is malformed
    InvalidEmail,
    /// The credential was rejected by the identity store
    WeakPassword,
    /// Wrong email/password pair
    InvalidCredentials,
    /// Caller is not allowed to perform the operation
    PermissionDenied,
    /// Referenced record, blob or identity does not exist
    NotFound,
    /// Backend temporarily unreachable; it recovers on its own
    Unavailable,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Stable code used in logs and API bodies
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::EmailAlreadyInUse => "email-already-in-use",
            ErrorKind::InvalidEmail => "invalid-email",
            ErrorKind::WeakPassword => "weak-password",
            ErrorKind::InvalidCredentials => "invalid-credentials",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by the identity, record and blob stores
#[derive(Error, Debug, Clone)]
#[error("{kind}: {detail}")]
pub struct StoreError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl StoreError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, detail)
    }

    /// Transient failures are expected to clear without intervention
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::Internal,
        };
        StoreError::new(kind, err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::internal(format!("serialization: {}", err))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
