//! Admin dashboard
//!
//! Owns the three live views, the recipient selectors and the forms, all
//! sharing one [`Backend`]. Started once per process and shut down with
//! [`Dashboard::shutdown`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::control::ControlState;
use super::error::PortalResult;
use super::events::DashboardEvents;
use super::forms::{
    generate_password, Confirmation, DocumentForm, InvestorCreated, InvestorForm,
    InvestorRemoved, MessageForm, NewInvestor, NewMessage,
};
use super::model::{Document, Investor, Message};
use super::notifier::{CrossViewNotifier, RecipientSelector};
use super::render::{
    render_banner, render_dashboard, DashboardPage, DocumentListRenderer, InvestorListRenderer,
    MessageListRenderer, RecipientNames,
};
use super::session::AdminContext;
use super::upload::{DocumentUpload, UploadPipeline, UploadState};
use crate::live::{LiveCollectionView, Subscription, ViewListener, ViewStatus, ViewUpdate};
use crate::store::{Backend, Collection, Direction, Query, StoreResult, MIN_PASSWORD_LENGTH};

/// Selector on the message form
pub const MESSAGE_RECIPIENT: &str = "messageRecipient";
/// Selector on the document upload form
pub const DOCUMENT_RECIPIENT: &str = "documentRecipient";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSettings {
    pub company_name: String,
    pub login_path: String,
    pub min_password_length: usize,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            company_name: "Blackpine Capital".to_string(),
            login_path: "/admin/login".to_string(),
            min_password_length: MIN_PASSWORD_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_investors: usize,
    pub total_messages: usize,
    pub total_documents: usize,
}

fn publisher<T: 'static>(events: &Arc<dyn DashboardEvents>) -> ViewListener<T> {
    let events = Arc::clone(events);
    Arc::new(move |update: &ViewUpdate<'_, T>| {
        events.view_rendered(update.view, update.items.len(), update.markup)
    })
}

pub struct Dashboard {
    settings: PortalSettings,
    investors: LiveCollectionView<Investor>,
    messages: LiveCollectionView<Message>,
    documents: LiveCollectionView<Document>,
    notifier: Arc<CrossViewNotifier>,
    investor_form: InvestorForm,
    message_form: MessageForm,
    document_form: DocumentForm,
    uploads: Arc<UploadPipeline>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Dashboard {
    /// Subscribe the three views and wire their listeners
    pub async fn start(
        backend: Backend,
        settings: PortalSettings,
        events: Arc<dyn DashboardEvents>,
    ) -> StoreResult<Self> {
        let notifier = Arc::new(CrossViewNotifier::new(
            &[MESSAGE_RECIPIENT, DOCUMENT_RECIPIENT],
            Arc::clone(&events),
        ));

        let (investors, investors_sub) = LiveCollectionView::start(
            "investors",
            Arc::clone(&backend.records),
            Query::collection(Collection::Investors).order_by("createdAt", Direction::Desc),
            Arc::new(InvestorListRenderer),
            vec![notifier.listener(), publisher(&events)],
        )
        .await?;

        let names = RecipientNames::new(investors.clone());
        let (messages, messages_sub) = LiveCollectionView::start(
            "messages",
            Arc::clone(&backend.records),
            Query::collection(Collection::Messages).order_by("sentAt", Direction::Desc),
            Arc::new(MessageListRenderer::new(names.clone())),
            vec![publisher(&events)],
        )
        .await?;

        let (documents, documents_sub) = LiveCollectionView::start(
            "documents",
            Arc::clone(&backend.records),
            Query::collection(Collection::Documents).order_by("uploadedAt", Direction::Desc),
            Arc::new(DocumentListRenderer::new(names)),
            vec![publisher(&events)],
        )
        .await?;

        // Message and document rows show investor names
        let (names_in_messages, names_in_documents) = (messages.clone(), documents.clone());
        investors.add_listener(Arc::new(move |_: &ViewUpdate<'_, Investor>| {
            names_in_messages.refresh();
            names_in_documents.refresh();
        }));
        // Investors may have landed before the listener was attached
        messages.refresh();
        documents.refresh();

        let uploads = Arc::new(UploadPipeline::new(backend.clone(), events));
        tracing::info!("Dashboard started");

        Ok(Self {
            investor_form: InvestorForm::new(backend.clone(), settings.clone()),
            message_form: MessageForm::new(backend.clone(), Arc::clone(&uploads)),
            document_form: DocumentForm::new(backend),
            settings,
            investors,
            messages,
            documents,
            notifier,
            uploads,
            subscriptions: Mutex::new(vec![investors_sub, messages_sub, documents_sub]),
        })
    }

    /// Wait until every view has applied its first snapshot
    pub async fn ready(&self) {
        self.investors.wait_for_generation(1).await;
        self.messages.wait_for_generation(1).await;
        self.documents.wait_for_generation(1).await;
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    pub fn investors(&self) -> &LiveCollectionView<Investor> {
        &self.investors
    }

    pub fn messages(&self) -> &LiveCollectionView<Message> {
        &self.messages
    }

    pub fn documents(&self) -> &LiveCollectionView<Document> {
        &self.documents
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            total_investors: self.investors.len(),
            total_messages: self.messages.len(),
            total_documents: self.documents.len(),
        }
    }

    pub fn view_statuses(&self) -> Vec<(String, ViewStatus)> {
        vec![
            (self.investors.name().to_string(), self.investors.status()),
            (self.messages.name().to_string(), self.messages.status()),
            (self.documents.name().to_string(), self.documents.status()),
        ]
    }

    /// Error banner markup; empty while every view is healthy
    pub fn banner(&self) -> String {
        render_banner(&self.view_statuses())
    }

    pub fn selectors(&self) -> Vec<RecipientSelector> {
        self.notifier.selectors()
    }

    pub fn select_recipient(&self, selector: &str, value: &str) -> bool {
        self.notifier.select(selector, value)
    }

    pub fn upload_state(&self) -> UploadState {
        self.uploads.state()
    }

    pub fn controls(&self) -> Vec<ControlState> {
        vec![
            self.investor_form.control(),
            self.message_form.control(),
            self.uploads.control(),
        ]
    }

    pub async fn add_investor(
        &self,
        ctx: &AdminContext,
        input: NewInvestor,
    ) -> PortalResult<InvestorCreated> {
        self.investor_form.create(ctx, input).await
    }

    pub async fn remove_investor(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> PortalResult<InvestorRemoved> {
        self.investor_form.remove(id, confirmation).await
    }

    pub async fn reset_investor_password(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> PortalResult<String> {
        self.investor_form.reset_password(id, confirmation).await
    }

    pub async fn send_message(&self, ctx: &AdminContext, input: NewMessage) -> PortalResult<Message> {
        self.message_form.send(ctx, input).await
    }

    pub async fn upload_document(
        &self,
        ctx: &AdminContext,
        upload: DocumentUpload,
    ) -> PortalResult<Document> {
        self.uploads.upload(ctx, upload).await
    }

    pub async fn delete_document(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> PortalResult<Document> {
        self.document_form.delete(id, confirmation).await
    }

    /// Full dashboard markup for `ctx`
    pub fn page(&self, ctx: &AdminContext, notice: Option<&str>) -> String {
        let stats = self.stats();
        let message_recipients = self
            .notifier
            .selector(MESSAGE_RECIPIENT)
            .unwrap_or_else(|| RecipientSelector::new(MESSAGE_RECIPIENT));
        let document_recipients = self
            .notifier
            .selector(DOCUMENT_RECIPIENT)
            .unwrap_or_else(|| RecipientSelector::new(DOCUMENT_RECIPIENT));
        let suggested_password = generate_password();

        render_dashboard(&DashboardPage {
            company_name: &self.settings.company_name,
            admin_email: &ctx.email,
            min_password_length: self.settings.min_password_length,
            suggested_password: &suggested_password,
            total_investors: stats.total_investors,
            total_messages: stats.total_messages,
            total_documents: stats.total_documents,
            investors_markup: &self.investors.markup(),
            messages_markup: &self.messages.markup(),
            documents_markup: &self.documents.markup(),
            message_recipients: &message_recipients,
            document_recipients: &document_recipients,
            add_investor: self.investor_form.control(),
            send_message: self.message_form.control(),
            upload_document: self.uploads.control(),
            banner: self.banner(),
            notice,
        })
    }

    /// Cancel every view subscription
    pub fn shutdown(&self) {
        let subscriptions: Vec<Subscription> = match self.subscriptions.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        let count = subscriptions.len();
        for subscription in subscriptions {
            subscription.cancel();
        }
        if count > 0 {
            tracing::info!(subscriptions = count, "Dashboard shut down");
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
