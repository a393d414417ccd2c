//! Session plumbing
//!
//! Token extraction (cookie or bearer header), the [`Admin`] extractor and
//! the response helpers shared by HTML form posts and JSON clients.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::portal::{AdminContext, GuardOutcome, PortalResult};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "portal_session";

/// Session token from `Authorization: Bearer` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        token,
        if secure { "; Secure" } else { "" }
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// A request made by a signed-in administrator
pub struct Admin(pub AdminContext);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        match state.guard.check(token.as_deref()).await {
            GuardOutcome::Proceed(ctx) => Ok(Admin(ctx)),
            GuardOutcome::Redirect { .. } => Err(ApiError::Unauthorized),
        }
    }
}

/// Whether the caller is a browser form or an API client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wants {
    Html,
    Json,
}

impl Wants {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accepts_html = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);
        if accepts_html {
            Wants::Html
        } else {
            Wants::Json
        }
    }
}

/// `location?notice=...`
pub fn redirect_with_notice(location: &str, notice: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?notice={}",
        location,
        urlencoding::encode(notice)
    ))
}

/// Turn an action outcome into a response.
///
/// Browsers are sent back to `/admin` with the outcome as a notice; API
/// clients get the payload as JSON or the error body.
pub fn finish<T: Serialize>(
    wants: Wants,
    result: PortalResult<T>,
    status: StatusCode,
    notice: impl FnOnce(&T) -> String,
) -> ApiResult<Response> {
    match (wants, result) {
        (Wants::Html, Ok(value)) => Ok(redirect_with_notice("/admin", &notice(&value)).into_response()),
        (Wants::Html, Err(e)) => {
            tracing::warn!(error = %e, "Dashboard action failed");
            Ok(redirect_with_notice("/admin", &e.user_message()).into_response())
        }
        (Wants::Json, Ok(value)) => Ok((status, Json(value)).into_response()),
        (Wants::Json, Err(e)) => Err(e.into()),
    }
}

/// Attach a `Set-Cookie` header
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; portal_session=abc123"),
        );
        assert_eq!(session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_bearer_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("portal_session=abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers), Some("xyz".to_string()));
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_wants() {
        let mut headers = HeaderMap::new();
        assert_eq!(Wants::from_headers(&headers), Wants::Json);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert_eq!(Wants::from_headers(&headers), Wants::Html);
    }

    #[test]
    fn test_cookie_shape() {
        assert_eq!(
            session_cookie("t", true),
            "portal_session=t; Path=/; HttpOnly; SameSite=Lax; Secure"
        );
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
