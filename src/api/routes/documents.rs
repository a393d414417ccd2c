//! Document Routes
//!
//! - GET /api/v1/documents - Mirror of the documents view
//! - POST /api/v1/documents - Upload a document (multipart)
//! - POST /api/v1/documents/:id/delete - Delete a document and its file
//! - GET /api/v1/uploads/status - Upload panel state

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Form, Json,
};
use std::sync::Arc;

use super::investors::confirmation;
use super::messages::{file_field, text_field};
use crate::api::dto::{ConfirmForm, ListResponse, UploadStatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{finish, Admin, Wants};
use crate::api::state::AppState;
use crate::portal::{Document, DocumentCategory, DocumentUpload, FileSource, Recipient};

/// GET /api/v1/documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<ListResponse<Document>>> {
    let dashboard = state.dashboard().await?;
    let view = dashboard.documents();
    Ok(Json(ListResponse::new(view.items(), view.status())))
}

/// POST /api/v1/documents
///
/// Fields: `file`, `category`, `recipient`, `source` (`picker` or
/// `drag-and-drop`).
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut file = None;
    let mut category = DocumentCategory::Other;
    let mut recipient = Recipient::All;
    let mut source = FileSource::Picker;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => file = file_field(field).await?,
            Some("category") => {
                category = text_field(field)
                    .await?
                    .parse()
                    .map_err(ApiError::Validation)?;
            }
            Some("recipient") => recipient = Recipient::from(text_field(field).await?),
            Some("source") => {
                if text_field(field).await? == "drag-and-drop" {
                    source = FileSource::DragAndDrop;
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let dashboard = state.dashboard().await?;
    let upload = DocumentUpload {
        file: file.map(|f| f.source(source)),
        category,
        recipient,
    };
    let result = dashboard.upload_document(&ctx, upload).await;
    finish(Wants::from_headers(&headers), result, StatusCode::CREATED, |_| {
        "Document uploaded successfully!".to_string()
    })
}

/// POST /api/v1/documents/:id/delete
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Option<Form<ConfirmForm>>,
) -> ApiResult<Response> {
    let dashboard = state.dashboard().await?;
    let result = dashboard.delete_document(&id, confirmation(form)).await;
    finish(Wants::from_headers(&headers), result, StatusCode::OK, |_| {
        "Document deleted successfully!".to_string()
    })
}

/// GET /api/v1/uploads/status
pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<UploadStatusResponse>> {
    let dashboard = state.dashboard().await?;
    let control = dashboard
        .controls()
        .into_iter()
        .find(|c| c.id == "uploadDocumentBtn")
        .ok_or_else(|| ApiError::Internal("upload control missing".to_string()))?;
    Ok(Json(UploadStatusResponse {
        state: dashboard.upload_state(),
        control,
    }))
}
