//! Message Routes
//!
//! - GET /api/v1/messages - Mirror of the messages view
//! - POST /api/v1/messages - Send a message (multipart, optional attachment)

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::api::dto::ListResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{finish, Admin, Wants};
use crate::api::state::AppState;
use crate::portal::{FileSource, Message, NewMessage, Recipient, SelectedFile};

/// GET /api/v1/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<ListResponse<Message>>> {
    let dashboard = state.dashboard().await?;
    let view = dashboard.messages();
    Ok(Json(ListResponse::new(view.items(), view.status())))
}

/// POST /api/v1/messages
///
/// Fields: `recipient`, `subject`, `body`, `attachment` (file, optional).
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut recipient = Recipient::All;
    let mut subject = String::new();
    let mut body = String::new();
    let mut attachment = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("recipient") => recipient = Recipient::from(text_field(field).await?),
            Some("subject") => subject = text_field(field).await?,
            Some("body") => body = text_field(field).await?,
            Some("attachment") => attachment = file_field(field).await?,
            _ => {} // ignore unknown fields
        }
    }

    let dashboard = state.dashboard().await?;
    let input = NewMessage {
        recipient,
        subject,
        body,
        attachment,
    };
    let result = dashboard.send_message(&ctx, input).await;
    finish(Wants::from_headers(&headers), result, StatusCode::CREATED, |_| {
        "Message sent successfully!".to_string()
    })
}

pub(crate) async fn text_field(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Read error: {}", e)))
}

/// A file input; an empty file name means nothing was chosen
pub(crate) async fn file_field(field: Field<'_>) -> ApiResult<Option<SelectedFile>> {
    let name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("Read error: {}", e)))?;

    if name.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        SelectedFile::new(name, content_type, data.to_vec()).source(FileSource::Picker),
    ))
}
