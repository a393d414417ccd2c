//! Page Routes
//!
//! - GET /             - Public landing page
//! - GET /admin        - Admin dashboard (guarded)
//! - GET /admin/login  - Login form
//! - POST /admin/login - Sign in
//! - POST /admin/logout - Sign out

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;

use crate::api::dto::{LoginForm, PageParams};
use crate::api::error::ApiResult;
use crate::api::session::{
    clear_session_cookie, redirect_with_notice, session_cookie, session_token, with_cookie,
};
use crate::api::state::AppState;
use crate::portal::render::render_login;
use crate::portal::{GuardOutcome, PortalError};
use crate::site::{render_public_page, DEFAULT_SECTIONS};

/// GET /
pub async fn public_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_public_page(&state.settings.company_name, &DEFAULT_SECTIONS))
}

/// GET /admin
///
/// Runs the Session Guard; the dashboard is started on the first pass.
pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> ApiResult<Response> {
    let token = session_token(&headers);
    let ctx = match state.guard.check(token.as_deref()).await {
        GuardOutcome::Proceed(ctx) => ctx,
        GuardOutcome::Redirect {
            location,
            signed_out,
        } => {
            let response = if signed_out {
                with_cookie(
                    redirect_with_notice(
                        &location,
                        &PortalError::NotPrivileged.user_message(),
                    )
                    .into_response(),
                    &clear_session_cookie(),
                )
            } else {
                Redirect::to(&location).into_response()
            };
            return Ok(response);
        }
    };

    let dashboard = state.dashboard().await?;
    Ok(Html(dashboard.page(&ctx, params.notice.as_deref())).into_response())
}

/// GET /admin/login
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Response {
    let token = session_token(&headers);
    if token.is_some() {
        if let GuardOutcome::Proceed(_) = state.guard.check(token.as_deref()).await {
            return Redirect::to("/admin").into_response();
        }
    }
    Html(render_login(
        &state.settings.company_name,
        None,
        params.notice.as_deref(),
    ))
    .into_response()
}

/// POST /admin/login
pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    match state.guard.sign_in(&form.email, &form.password).await {
        Ok(ctx) => with_cookie(
            Redirect::to("/admin").into_response(),
            &session_cookie(&ctx.session_token, state.config.secure_cookies),
        ),
        Err(e) => {
            tracing::warn!(email = %form.email, error = %e, "Admin sign-in rejected");
            let status = match e {
                PortalError::NotPrivileged => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            };
            (
                status,
                Html(render_login(
                    &state.settings.company_name,
                    Some(&e.user_message()),
                    None,
                )),
            )
                .into_response()
        }
    }
}

/// POST /admin/logout
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.guard.sign_out(&token).await {
            tracing::warn!(error = %e, "Sign-out failed");
        }
    }
    with_cookie(
        Redirect::to(state.guard.login_path()).into_response(),
        &clear_session_cookie(),
    )
}
