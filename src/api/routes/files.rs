//! File Routes
//!
//! - GET /files/*path - Download a stored blob
//!
//! Any signed-in identity may download; investors follow the same URLs
//! stored on their messages and documents.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::session::session_token;
use crate::api::state::AppState;

/// GET /files/*path
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = session_token(&headers).ok_or(ApiError::Unauthorized)?;
    if state.backend.identity.current_user(&token).await?.is_none() {
        return Err(ApiError::Unauthorized);
    }

    let data = state.backend.blobs.fetch(&path).await?;
    let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
    tracing::debug!(path = %path, bytes = data.len(), "Blob served");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
            ),
        ],
        data,
    )
        .into_response())
}
