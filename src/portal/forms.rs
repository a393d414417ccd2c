//! Record Mutation Forms
//!
//! Validated create/delete actions against the backend. Each submit form
//! owns a [`SubmitControl`]; row actions (remove, reset, delete) require an
//! explicit [`Confirmation`], perform no mutation without one, and keep
//! their row's button busy through [`RowControls`] while they run.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use super::control::{ControlState, RowControls, SubmitControl};
use super::dashboard::PortalSettings;
use super::error::{AccountStage, Action, PortalError, PortalResult};
use super::model::{Attachment, Document, Investor, Message, Recipient};
use super::session::AdminContext;
use super::upload::{SelectedFile, UploadPipeline, ATTACHMENTS_PREFIX};
use crate::store::{to_fields, Backend, Collection, ErrorKind, StoreError};

const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";
const PASSWORD_LENGTH: usize = 10;

/// Temporary password from an alphabet without look-alike characters
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

/// Operator's answer to a destructive-action prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Missing,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Missing
        }
    }
}

fn require(confirmation: Confirmation, prompt: String) -> PortalResult<()> {
    match confirmation {
        Confirmation::Confirmed => Ok(()),
        Confirmation::Missing => Err(PortalError::ConfirmationRequired { prompt }),
    }
}

#[derive(Debug, Clone)]
pub struct NewInvestor {
    pub name: String,
    pub email: String,
    /// Generated when absent
    pub password: Option<String>,
}

/// Outcome of the best-effort password-reset email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ResetDelivery {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct InvestorCreated {
    pub investor: Investor,
    pub welcome_message_id: String,
    pub reset: ResetDelivery,
    pub temporary_password: String,
    /// The admin session was terminated and re-authentication is required
    pub session_ended: bool,
}

impl InvestorCreated {
    /// Text shown to the operator
    pub fn summary(&self) -> String {
        let Investor { name, email, .. } = &self.investor;
        let delivery = match &self.reset {
            ResetDelivery::Sent => format!(
                "A welcome email with password reset instructions has been sent to {}.\n\n\
                 Temporary Password: {}",
                email, self.temporary_password
            ),
            ResetDelivery::Failed(_) => format!(
                "Note: Could not send password reset email. Please share these credentials manually:\n\n\
                 Email: {}\nTemporary Password: {}",
                email, self.temporary_password
            ),
        };
        let mut summary = format!(
            "Investor {} added successfully!\n\n{}\n\nA welcome message has been added to their dashboard.",
            name, delivery
        );
        if self.session_ended {
            summary.push_str("\n\nYou have been logged out for security. Please log back in.");
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvestorRemoved {
    pub id: String,
    pub name: String,
    pub notice: String,
}

fn welcome_message(company: &str, name: &str, email: &str, uid: &str, sent_by: &str) -> Message {
    Message {
        id: String::new(),
        recipient_id: Recipient::Investor(uid.to_string()),
        subject: format!("Welcome to {} Investor Portal", company),
        body: format!(
            "Dear {name},\n\n\
             Welcome to the {company} Investor Portal! Your account has been created successfully.\n\n\
             You can now log in to access:\n\
             \u{2022} Important messages and updates\n\
             \u{2022} Tax forms and financial statements\n\
             \u{2022} Quarterly reports and documents\n\n\
             Your login email: {email}\n\n\
             For security, we recommend changing your password after your first login. \
             You can do this by clicking \"Forgot Password\" on the login page.\n\n\
             If you have any questions, please don't hesitate to reach out.\n\n\
             Best regards,\n{company} Team"
        ),
        sent_at: Some(Utc::now()),
        sent_by: sent_by.to_string(),
        read_at: None,
        attachment_url: None,
        attachment_name: None,
        attachment_size: None,
    }
}

/// Add / remove / reset-password actions on investors
pub struct InvestorForm {
    backend: Backend,
    settings: PortalSettings,
    control: SubmitControl,
    remove_controls: RowControls,
    reset_controls: RowControls,
}

impl InvestorForm {
    pub fn new(backend: Backend, settings: PortalSettings) -> Self {
        Self {
            backend,
            settings,
            control: SubmitControl::new("addInvestorBtn", "Add Investor"),
            remove_controls: RowControls::new("removeInvestor", "Remove"),
            reset_controls: RowControls::new("resetPassword", "Reset Password"),
        }
    }

    pub fn control(&self) -> ControlState {
        self.control.state()
    }

    /// "Remove" button of investor `id`
    pub fn remove_control(&self, id: &str) -> ControlState {
        self.remove_controls.state(id)
    }

    /// "Reset Password" button of investor `id`
    pub fn reset_control(&self, id: &str) -> ControlState {
        self.reset_controls.state(id)
    }

    fn validate(&self, input: &NewInvestor, password: &str) -> PortalResult<()> {
        if input.name.trim().is_empty() {
            return Err(PortalError::Validation(
                "Please enter the investor's name.".to_string(),
            ));
        }
        if input.email.trim().is_empty() {
            return Err(PortalError::Validation(
                "Please enter an email address.".to_string(),
            ));
        }
        if password.chars().count() < self.settings.min_password_length {
            return Err(PortalError::Validation(format!(
                "Password must be at least {} characters long.",
                self.settings.min_password_length
            )));
        }
        Ok(())
    }

    /// Create the login, profile and welcome message of a new investor.
    ///
    /// Ends the admin's session on success.
    pub async fn create(&self, ctx: &AdminContext, input: NewInvestor) -> PortalResult<InvestorCreated> {
        let password = input
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(generate_password);
        self.validate(&input, &password)?;

        let name = input.name.trim().to_string();
        let email = input.email.trim().to_string();
        let _guard = self.control.begin("Adding...")?;

        let user = self
            .backend
            .identity
            .create_user(&email, &password)
            .await
            .map_err(|e| PortalError::backend(Action::AddInvestor, e))?;

        let incomplete = |stage: AccountStage, source: StoreError| {
            tracing::error!(uid = %user.uid, stage = %stage, error = %source, "Investor account left incomplete");
            PortalError::IncompleteAccount {
                uid: user.uid.clone(),
                email: email.clone(),
                stage,
                source,
            }
        };

        let investor = Investor {
            id: user.uid.clone(),
            name: name.clone(),
            email: email.clone(),
            created_at: Some(Utc::now()),
            last_login: None,
        };
        let fields = to_fields(&investor).map_err(|e| incomplete(AccountStage::Profile, e))?;
        self.backend
            .records
            .set(Collection::Investors, &user.uid, fields)
            .await
            .map_err(|e| incomplete(AccountStage::Profile, e))?;

        let welcome = welcome_message(&self.settings.company_name, &name, &email, &user.uid, &ctx.uid);
        let fields = to_fields(&welcome).map_err(|e| incomplete(AccountStage::WelcomeMessage, e))?;
        let welcome_message_id = self
            .backend
            .records
            .add(Collection::Messages, fields)
            .await
            .map_err(|e| incomplete(AccountStage::WelcomeMessage, e))?;

        let reset = match self.backend.identity.send_password_reset(&email).await {
            Ok(()) => ResetDelivery::Sent,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Password reset email not sent");
                ResetDelivery::Failed(e.to_string())
            }
        };

        let session_ended = match self.backend.identity.sign_out(&ctx.session_token).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(uid = %ctx.uid, error = %e, "Admin sign-out after account creation failed");
                false
            }
        };

        tracing::info!(uid = %user.uid, email = %email, "Investor added");
        Ok(InvestorCreated {
            investor,
            welcome_message_id,
            reset,
            temporary_password: password,
            session_ended,
        })
    }

    async fn load(&self, id: &str, action: Action) -> PortalResult<Investor> {
        let record = self
            .backend
            .records
            .get(Collection::Investors, id)
            .await
            .map_err(|e| PortalError::backend(action, e))?
            .ok_or_else(|| {
                PortalError::backend(action, StoreError::not_found(format!("investor {}", id)))
            })?;
        record.decode().map_err(|e| PortalError::backend(action, e))
    }

    /// Delete an investor's profile record; the login account is kept
    pub async fn remove(&self, id: &str, confirmation: Confirmation) -> PortalResult<InvestorRemoved> {
        let investor = self.load(id, Action::RemoveInvestor).await?;
        require(
            confirmation,
            format!(
                "Are you sure you want to remove {}? This action cannot be undone.",
                investor.name
            ),
        )?;
        let _guard = self.remove_controls.begin(id, "Removing...")?;

        self.backend
            .records
            .delete(Collection::Investors, id)
            .await
            .map_err(|e| PortalError::backend(Action::RemoveInvestor, e))?;

        tracing::info!(uid = %id, "Investor removed");
        Ok(InvestorRemoved {
            id: id.to_string(),
            notice: format!(
                "{} has been removed from the portal. Their login account still exists and \
                 must be deleted separately by an administrator with access to the identity service.",
                investor.name
            ),
            name: investor.name,
        })
    }

    /// Email the investor a password-reset link; returns the address used
    pub async fn reset_password(&self, id: &str, confirmation: Confirmation) -> PortalResult<String> {
        let investor = self.load(id, Action::ResetPassword).await?;
        require(
            confirmation,
            format!("Send password reset email to {}?", investor.email),
        )?;
        let _guard = self.reset_controls.begin(id, "Sending...")?;

        self.backend
            .identity
            .send_password_reset(&investor.email)
            .await
            .map_err(|e| PortalError::backend(Action::ResetPassword, e))?;

        tracing::info!(uid = %id, "Password reset sent");
        Ok(investor.email)
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub attachment: Option<SelectedFile>,
}

pub struct MessageForm {
    backend: Backend,
    uploads: Arc<UploadPipeline>,
    control: SubmitControl,
}

impl MessageForm {
    pub fn new(backend: Backend, uploads: Arc<UploadPipeline>) -> Self {
        Self {
            backend,
            uploads,
            control: SubmitControl::new("sendMessageBtn", "Send Message"),
        }
    }

    pub fn control(&self) -> ControlState {
        self.control.state()
    }

    /// Store the attachment, if any, then write the message record
    pub async fn send(&self, ctx: &AdminContext, input: NewMessage) -> PortalResult<Message> {
        if input.subject.trim().is_empty() || input.body.trim().is_empty() {
            return Err(PortalError::Validation(
                "Please enter a subject and message.".to_string(),
            ));
        }

        let guard = self.control.begin(if input.attachment.is_some() {
            "Uploading attachment..."
        } else {
            "Sending message..."
        })?;

        let mut message = Message {
            id: String::new(),
            recipient_id: input.recipient,
            subject: input.subject.trim().to_string(),
            body: input.body,
            sent_at: None,
            sent_by: ctx.uid.clone(),
            read_at: None,
            attachment_url: None,
            attachment_name: None,
            attachment_size: None,
        };

        if let Some(file) = &input.attachment {
            let stored = self
                .uploads
                .store_file(ATTACHMENTS_PREFIX, file, None)
                .await
                .map_err(|e| PortalError::backend(Action::SendMessage, e))?;
            message = message.with_attachment(Attachment {
                url: stored.url,
                name: file.name.clone(),
                size_bytes: stored.blob.size,
            });
            guard.set_label("Sending message...");
        }

        message.sent_at = Some(Utc::now());
        let written = match to_fields(&message) {
            Ok(fields) => self.backend.records.add(Collection::Messages, fields).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(id) => {
                message.id = id;
                tracing::info!(message_id = %message.id, recipient = %message.recipient_id, "Message sent");
                Ok(message)
            }
            Err(e) => match message.attachment_url {
                Some(url) => {
                    tracing::error!(url = %url, error = %e, "Attachment stored but message write failed");
                    Err(PortalError::OrphanedBlob { url, source: e })
                }
                None => Err(PortalError::backend(Action::SendMessage, e)),
            },
        }
    }
}

pub struct DocumentForm {
    backend: Backend,
    delete_controls: RowControls,
}

impl DocumentForm {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            delete_controls: RowControls::new("deleteDocument", "Delete"),
        }
    }

    /// "Delete" button of document `id`
    pub fn delete_control(&self, id: &str) -> ControlState {
        self.delete_controls.state(id)
    }

    /// Delete a document's blob, then its record
    pub async fn delete(&self, id: &str, confirmation: Confirmation) -> PortalResult<Document> {
        let action = Action::DeleteDocument;
        let document: Document = self
            .backend
            .records
            .get(Collection::Documents, id)
            .await
            .map_err(|e| PortalError::backend(action, e))?
            .ok_or_else(|| {
                PortalError::backend(action, StoreError::not_found(format!("document {}", id)))
            })?
            .decode()
            .map_err(|e| PortalError::backend(action, e))?;

        require(
            confirmation,
            format!(
                "Are you sure you want to delete \"{}\"? This action cannot be undone.",
                document.name
            ),
        )?;
        let _guard = self.delete_controls.begin(id, "Deleting...")?;

        match self.backend.blobs.delete_by_url(&document.storage_url).await {
            Ok(()) => {}
            Err(e) if e.kind == ErrorKind::NotFound => {
                tracing::warn!(document_id = %id, url = %document.storage_url, "Blob already gone");
            }
            Err(e) => return Err(PortalError::backend(action, e)),
        }

        self.backend
            .records
            .delete(Collection::Documents, id)
            .await
            .map_err(|e| {
                tracing::error!(document_id = %id, error = %e, "Blob deleted but record remains");
                PortalError::DanglingDocument {
                    id: id.to_string(),
                    source: e,
                }
            })?;

        tracing::info!(document_id = %id, "Document deleted");
        Ok(document)
    }
}
