//! Upload Pipeline
//!
//! Turns a selected file into a stored blob plus a document record,
//! publishing progress while the bytes are written.
//!
//! ```text
//! selected file → key → blob put (progress) → download URL → document record
//! ```

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::control::{ControlState, SubmitControl};
use super::error::{PortalError, PortalResult};
use super::events::DashboardEvents;
use super::model::{Document, DocumentCategory, Recipient};
use super::session::AdminContext;
use crate::store::{to_fields, Backend, BlobRef, Collection, ProgressSender, StoreResult};

/// Key prefix of uploaded documents
pub const DOCUMENTS_PREFIX: &str = "documents";
/// Key prefix of message attachments
pub const ATTACHMENTS_PREFIX: &str = "message-attachments";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// How the operator picked the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileSource {
    #[default]
    Picker,
    DragAndDrop,
}

/// A file chosen in the browser
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub source: FileSource,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            source: FileSource::Picker,
        }
    }

    /// Builder method: record where the selection came from
    pub fn source(mut self, source: FileSource) -> Self {
        self.source = source;
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A document upload submission
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file: Option<SelectedFile>,
    pub category: DocumentCategory,
    pub recipient: Recipient,
}

/// State of the document upload panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Uploading { percent: f64 },
    Completed { document_id: String },
    Failed { message: String },
}

/// Storage key generator
///
/// Keys embed a millisecond stamp that strictly increases per generator, so
/// two uploads of the same file name never share a key.
#[derive(Debug, Default)]
pub struct UploadKeys {
    last: AtomicI64,
}

impl UploadKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// `{prefix}/{millis}_{name}`
    pub fn key(&self, prefix: &str, name: &str) -> String {
        let name: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let name = if name.is_empty() { "file".to_string() } else { name };
        format!("{}/{}_{}", prefix, self.next_millis(), name)
    }
}

/// A stored blob and its download URL
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub blob: BlobRef,
    pub url: String,
}

pub struct UploadPipeline {
    backend: Backend,
    keys: UploadKeys,
    control: SubmitControl,
    state: watch::Sender<UploadState>,
    events: Arc<dyn DashboardEvents>,
}

impl UploadPipeline {
    pub fn new(backend: Backend, events: Arc<dyn DashboardEvents>) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            backend,
            keys: UploadKeys::new(),
            control: SubmitControl::new("uploadDocumentBtn", "Upload Document"),
            state,
            events,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn control(&self) -> ControlState {
        self.control.state()
    }

    fn publish(&self, state: UploadState) {
        self.events.upload_progress(&state);
        self.state.send_replace(state);
    }

    /// Store a file under a fresh key below `prefix`
    pub async fn store_file(
        &self,
        prefix: &str,
        file: &SelectedFile,
        progress: Option<ProgressSender>,
    ) -> StoreResult<StoredFile> {
        let key = self.keys.key(prefix, &file.name);
        let content_type = if file.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &file.content_type
        };

        let blob = self
            .backend
            .blobs
            .put(&key, &file.data, content_type, progress)
            .await?;
        let url = self.backend.blobs.download_url(&blob).await?;
        Ok(StoredFile { blob, url })
    }

    /// Upload a document and write its metadata record
    pub async fn upload(&self, ctx: &AdminContext, upload: DocumentUpload) -> PortalResult<Document> {
        let file = upload
            .file
            .ok_or_else(|| PortalError::Validation("Please select a file to upload.".to_string()))?;

        let _guard = self.control.begin("Uploading...")?;
        self.publish(UploadState::Uploading { percent: 0.0 });
        tracing::info!(
            file = %file.name,
            bytes = file.size(),
            source = ?file.source,
            category = %upload.category.as_str(),
            "Document upload started"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stored = self.store_file(DOCUMENTS_PREFIX, &file, Some(tx));
        let forward = async {
            let mut highest = 0.0;
            while let Some(progress) = rx.recv().await {
                let percent = progress.percent();
                if percent > highest {
                    highest = percent;
                    self.publish(UploadState::Uploading { percent });
                }
            }
        };
        // The sender lives inside the put, so forwarding ends with it.
        let (stored, ()) = tokio::join!(stored, forward);

        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(file = %file.name, error = %e, "Document upload failed");
                let err = PortalError::Upload(e);
                self.publish(UploadState::Failed {
                    message: err.user_message(),
                });
                return Err(err);
            }
        };

        let mut document = Document {
            id: String::new(),
            name: file.name.clone(),
            category: upload.category,
            recipient_id: upload.recipient,
            storage_url: stored.url.clone(),
            file_size: stored.blob.size,
            file_type: stored.blob.content_type.clone(),
            uploaded_at: Some(Utc::now()),
            uploaded_by: ctx.uid.clone(),
        };

        let written = match to_fields(&document) {
            Ok(fields) => self.backend.records.add(Collection::Documents, fields).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(id) => {
                document.id = id;
                tracing::info!(document_id = %document.id, key = %stored.blob.path, "Document uploaded");
                self.publish(UploadState::Completed {
                    document_id: document.id.clone(),
                });
                Ok(document)
            }
            Err(e) => {
                tracing::error!(url = %stored.url, error = %e, "Document stored but record write failed");
                let err = PortalError::OrphanedBlob {
                    url: stored.url,
                    source: e,
                };
                self.publish(UploadState::Failed {
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }
}
