//! Investor Routes
//!
//! - GET /api/v1/investors - Mirror of the investors view
//! - POST /api/v1/investors - Add an investor (ends the admin session)
//! - POST /api/v1/investors/:id/delete - Remove an investor profile
//! - POST /api/v1/investors/:id/password-reset - Send a reset email

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use std::sync::Arc;

use crate::api::dto::{ActionResponse, ConfirmForm, CreateInvestorForm, ListResponse};
use crate::api::error::ApiResult;
use crate::api::session::{clear_session_cookie, finish, redirect_with_notice, with_cookie, Admin, Wants};
use crate::api::state::AppState;
use crate::portal::{Confirmation, Investor, NewInvestor};

/// GET /api/v1/investors
pub async fn list_investors(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<ListResponse<Investor>>> {
    let dashboard = state.dashboard().await?;
    let view = dashboard.investors();
    Ok(Json(ListResponse::new(view.items(), view.status())))
}

/// POST /api/v1/investors
///
/// On success the admin session is gone; browsers land on the login page
/// with the credentials summary.
pub async fn create_investor(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    headers: HeaderMap,
    Form(form): Form<CreateInvestorForm>,
) -> ApiResult<Response> {
    let dashboard = state.dashboard().await?;
    let input = NewInvestor {
        name: form.name,
        email: form.email,
        password: form.password.filter(|p| !p.is_empty()),
    };

    let result = dashboard.add_investor(&ctx, input).await;
    let wants = Wants::from_headers(&headers);
    match result {
        Ok(created) if created.session_ended => {
            let response = match wants {
                Wants::Html => {
                    redirect_with_notice(state.guard.login_path(), &created.summary()).into_response()
                }
                Wants::Json => (StatusCode::CREATED, Json(created)).into_response(),
            };
            Ok(with_cookie(response, &clear_session_cookie()))
        }
        other => finish(wants, other, StatusCode::CREATED, |created| created.summary()),
    }
}

/// POST /api/v1/investors/:id/delete
pub async fn delete_investor(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Option<Form<ConfirmForm>>,
) -> ApiResult<Response> {
    let dashboard = state.dashboard().await?;
    let confirmation = confirmation(form);
    let result = dashboard.remove_investor(&id, confirmation).await;
    finish(Wants::from_headers(&headers), result, StatusCode::OK, |removed| {
        removed.notice.clone()
    })
}

/// POST /api/v1/investors/:id/password-reset
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<String>,
    headers: HeaderMap,
    form: Option<Form<ConfirmForm>>,
) -> ApiResult<Response> {
    let dashboard = state.dashboard().await?;
    let result = dashboard
        .reset_investor_password(&id, confirmation(form))
        .await
        .map(|email| ActionResponse::ok(format!("Password reset email sent successfully to {}!", email)));
    finish(Wants::from_headers(&headers), result, StatusCode::OK, |response| {
        response.message.clone()
    })
}

/// A missing or unparsable form counts as unconfirmed
pub(crate) fn confirmation(form: Option<Form<ConfirmForm>>) -> Confirmation {
    Confirmation::from(form.map(|Form(f)| f.confirm).unwrap_or(false))
}
