//! Admin portal
//!
//! Everything behind the Session Guard:
//!
//! - **session**: admin gate and sign-in
//! - **dashboard**: live views, selectors and forms for one process
//! - **forms** / **control**: validated mutations with busy-state feedback
//! - **upload**: file → blob → document record, with progress
//! - **notifier**: recipient selectors following the investor mirror
//! - **render**: list, page and formatting helpers
//! - **events**: where dashboard updates are pushed

pub mod control;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod forms;
pub mod model;
pub mod notifier;
pub mod render;
pub mod session;
pub mod upload;

pub use control::{BusyGuard, ControlState, SubmitControl};
pub use dashboard::{Dashboard, DashboardStats, PortalSettings, DOCUMENT_RECIPIENT, MESSAGE_RECIPIENT};
pub use error::{Action, AccountStage, PortalError, PortalResult};
pub use events::{DashboardEvents, NoopEvents};
pub use forms::{
    generate_password, Confirmation, InvestorCreated, InvestorRemoved, NewInvestor, NewMessage,
    ResetDelivery,
};
pub use model::{Attachment, Document, DocumentCategory, Investor, Message, Recipient};
pub use notifier::{CrossViewNotifier, RecipientSelector, SelectOption};
pub use session::{AdminContext, GuardOutcome, SessionGuard};
pub use upload::{DocumentUpload, FileSource, SelectedFile, UploadKeys, UploadPipeline, UploadState};
