//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::portal::PortalError;
use crate::store::{ErrorKind, StoreError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No admin session
    #[error("Not signed in")]
    Unauthorized,

    /// Dashboard operation failed
    #[error(transparent)]
    Portal(#[from] PortalError),

    /// Backend store error outside a dashboard operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (dependency down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

fn classify_store(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmailAlreadyInUse => StatusCode::CONFLICT,
        ErrorKind::InvalidEmail | ErrorKind::WeakPassword => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    /// Status and machine-readable code
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Portal(e) => match e {
                PortalError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                PortalError::Busy(_) => (StatusCode::CONFLICT, "BUSY"),
                PortalError::ConfirmationRequired { .. } => {
                    (StatusCode::PRECONDITION_REQUIRED, "CONFIRMATION_REQUIRED")
                }
                PortalError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                PortalError::NotPrivileged => (StatusCode::FORBIDDEN, "NOT_PRIVILEGED"),
                PortalError::Backend { source, .. } => {
                    (classify_store(source.kind), source.kind.code())
                }
                PortalError::IncompleteAccount { .. }
                | PortalError::OrphanedBlob { .. }
                | PortalError::DanglingDocument { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_FAILURE")
                }
                PortalError::Upload(source) => (classify_store(source.kind), "UPLOAD_FAILED"),
            },
            ApiError::Store(e) => (classify_store(e.kind), e.kind.code()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }

    /// Text safe to show the operator
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Portal(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.user_message(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
