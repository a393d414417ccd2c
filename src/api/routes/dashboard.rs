//! Dashboard Routes
//!
//! - GET /api/v1/stats - Counters, selector state and control state
//! - POST /api/v1/recipients/:selector - Change a recipient selection

use axum::{
    extract::{Path, State},
    Form, Json,
};
use std::sync::Arc;

use crate::api::dto::{ActionResponse, SelectRecipientForm, StatsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::Admin;
use crate::api::state::AppState;

/// GET /api/v1/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<StatsResponse>> {
    let dashboard = state.dashboard().await?;
    Ok(Json(StatsResponse {
        stats: dashboard.stats(),
        selectors: dashboard.selectors(),
        controls: dashboard.controls(),
    }))
}

/// POST /api/v1/recipients/:selector
///
/// Only values currently offered by the selector are accepted.
pub async fn select_recipient(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(selector): Path<String>,
    Form(form): Form<SelectRecipientForm>,
) -> ApiResult<Json<ActionResponse>> {
    let dashboard = state.dashboard().await?;
    if !dashboard.selectors().iter().any(|s| s.id == selector) {
        return Err(ApiError::NotFound(format!("selector {}", selector)));
    }
    if !dashboard.select_recipient(&selector, &form.value) {
        return Err(ApiError::Validation(format!(
            "'{}' is not an option of {}",
            form.value, selector
        )));
    }
    Ok(Json(ActionResponse::ok(format!(
        "{} set to {}",
        selector, form.value
    ))))
}
