//! Portal error types
//!
//! Backend failures arrive classified by [`ErrorKind`]; this module maps
//! them, together with validation and partial-failure conditions, to the
//! text shown to the operator.

use std::fmt;
use thiserror::Error;

use crate::store::{ErrorKind, StoreError};

/// Operator action a backend failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddInvestor,
    RemoveInvestor,
    ResetPassword,
    SendMessage,
    UploadDocument,
    DeleteDocument,
    SignIn,
    SignOut,
}

impl Action {
    fn failure_prefix(&self) -> &'static str {
        match self {
            Action::AddInvestor => "Failed to add investor.",
            Action::RemoveInvestor => "Failed to remove investor.",
            Action::ResetPassword => "Failed to send password reset email.",
            Action::SendMessage => "Failed to send message.",
            Action::UploadDocument => "Failed to upload document.",
            Action::DeleteDocument => "Failed to delete document.",
            Action::SignIn => "Failed to sign in.",
            Action::SignOut => "Failed to sign out.",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::AddInvestor => "add investor",
            Action::RemoveInvestor => "remove investor",
            Action::ResetPassword => "reset password",
            Action::SendMessage => "send message",
            Action::UploadDocument => "upload document",
            Action::DeleteDocument => "delete document",
            Action::SignIn => "sign in",
            Action::SignOut => "sign out",
        };
        f.write_str(name)
    }
}

/// Which write of the account sequence did not land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStage {
    Profile,
    WelcomeMessage,
}

impl fmt::Display for AccountStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStage::Profile => f.write_str("investor profile"),
            AccountStage::WelcomeMessage => f.write_str("welcome message"),
        }
    }
}

/// Errors surfaced by dashboard operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Input rejected before any backend call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The form's submit control is already running an action
    #[error("{0} is already in progress")]
    Busy(String),

    /// Destructive action submitted without confirmation
    #[error("Confirmation required: {prompt}")]
    ConfirmationRequired { prompt: String },

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Not an administrator")]
    NotPrivileged,

    /// The backend rejected the action; nothing was changed
    #[error("{action} failed: {source}")]
    Backend {
        action: Action,
        #[source]
        source: StoreError,
    },

    /// Identity exists but a later write of the account sequence failed
    #[error("account {uid} created but its {stage} was not saved: {source}")]
    IncompleteAccount {
        uid: String,
        email: String,
        stage: AccountStage,
        #[source]
        source: StoreError,
    },

    /// Blob stored but the record referencing it was not written
    #[error("blob {url} stored but its record was not written: {source}")]
    OrphanedBlob {
        url: String,
        #[source]
        source: StoreError,
    },

    /// Blob deleted but its metadata record is still present
    #[error("blob of document {id} deleted but its record remains: {source}")]
    DanglingDocument {
        id: String,
        #[source]
        source: StoreError,
    },

    /// Blob upload failed; no record was written
    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),
}

impl PortalError {
    pub fn backend(action: Action, source: StoreError) -> Self {
        PortalError::Backend { action, source }
    }

    /// True when part of the action took effect and needs operator attention
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            PortalError::IncompleteAccount { .. }
                | PortalError::OrphanedBlob { .. }
                | PortalError::DanglingDocument { .. }
        )
    }

    /// Backend classification, if the error came from a store
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PortalError::Backend { source, .. }
            | PortalError::IncompleteAccount { source, .. }
            | PortalError::OrphanedBlob { source, .. }
            | PortalError::DanglingDocument { source, .. }
            | PortalError::Upload(source) => Some(source.kind),
            _ => None,
        }
    }

    /// Text shown to the operator
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(message) => message.clone(),
            PortalError::Busy(_) => "Please wait for the current action to finish.".to_string(),
            PortalError::ConfirmationRequired { prompt } => prompt.clone(),
            PortalError::NotAuthenticated => "Please sign in.".to_string(),
            PortalError::NotPrivileged => {
                "This account does not have administrator access.".to_string()
            }
            PortalError::Backend { action, source } => {
                format!("{} {}", action.failure_prefix(), describe(source))
            }
            PortalError::IncompleteAccount {
                email,
                stage,
                source,
                ..
            } => format!(
                "The login for {} was created, but its {} could not be saved ({}). \
                 The account exists without a complete profile; finish or remove it manually.",
                email, stage, source.detail
            ),
            PortalError::OrphanedBlob { url, source } => format!(
                "The file was uploaded, but its record could not be saved ({}). \
                 The stored file at {} is not listed anywhere and must be removed manually.",
                source.detail, url
            ),
            PortalError::DanglingDocument { source, .. } => format!(
                "The file was deleted, but its listing could not be removed ({}). \
                 Delete the document again to clear it.",
                source.detail
            ),
            PortalError::Upload(_) => "Failed to upload document. Please try again.".to_string(),
        }
    }
}

fn describe(error: &StoreError) -> String {
    match error.kind {
        ErrorKind::EmailAlreadyInUse => "This email is already registered.".to_string(),
        ErrorKind::InvalidEmail => "Invalid email address.".to_string(),
        ErrorKind::WeakPassword => "The password is too weak.".to_string(),
        ErrorKind::InvalidCredentials => "Incorrect email or password.".to_string(),
        ErrorKind::PermissionDenied => "You do not have permission to do that.".to_string(),
        ErrorKind::NotFound => "It no longer exists.".to_string(),
        ErrorKind::Unavailable => "The service is unreachable. Please try again.".to_string(),
        ErrorKind::Internal => format!("Please try again. ({})", error.detail),
    }
}

/// Result type for portal operations
pub type PortalResult<T> = Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorized_messages() {
        let err = PortalError::backend(
            Action::AddInvestor,
            StoreError::new(ErrorKind::EmailAlreadyInUse, "jane@x.com"),
        );
        assert_eq!(
            err.user_message(),
            "Failed to add investor. This email is already registered."
        );

        let err = PortalError::backend(
            Action::AddInvestor,
            StoreError::new(ErrorKind::InvalidEmail, "bad"),
        );
        assert_eq!(err.user_message(), "Failed to add investor. Invalid email address.");
    }

    #[test]
    fn test_unknown_errors_include_detail() {
        let err = PortalError::backend(Action::SendMessage, StoreError::internal("disk full"));
        assert_eq!(
            err.user_message(),
            "Failed to send message. Please try again. (disk full)"
        );
        assert_eq!(err.kind(), Some(ErrorKind::Internal));
    }

    #[test]
    fn test_partial_failures_are_distinct() {
        let partial = PortalError::OrphanedBlob {
            url: "http://h/files/documents/1_a.pdf".to_string(),
            source: StoreError::internal("write failed"),
        };
        assert!(partial.is_partial());
        assert!(partial.user_message().contains("1_a.pdf"));

        let total = PortalError::Upload(StoreError::internal("write failed"));
        assert!(!total.is_partial());
        assert_eq!(total.user_message(), "Failed to upload document. Please try again.");
    }

    #[test]
    fn test_incomplete_account_message() {
        let err = PortalError::IncompleteAccount {
            uid: "u1".to_string(),
            email: "jane@x.com".to_string(),
            stage: AccountStage::WelcomeMessage,
            source: StoreError::unavailable("timeout"),
        };
        assert!(err.is_partial());
        assert!(err.user_message().contains("welcome message"));
        assert!(err.to_string().contains("u1"));
    }
}
