//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{HealthResponse, ViewHealth};
use crate::api::state::AppState;
use crate::live::ViewStatus;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Not ready once any live view has failed; a dashboard that has not
/// started yet counts as ready.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if view_health(&state).iter().any(|v| is_failed(&v.status)) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /health
///
/// Full health status with per-view details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let views = view_health(&state);

    let overall_status = if views.is_empty() {
        "idle"
    } else if views.iter().any(|v| is_failed(&v.status)) {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        views,
        websocket_connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn view_health(state: &AppState) -> Vec<ViewHealth> {
    state
        .started_dashboard()
        .map(|dashboard| {
            dashboard
                .view_statuses()
                .into_iter()
                .map(|(view, status)| ViewHealth { view, status })
                .collect()
        })
        .unwrap_or_default()
}

fn is_failed(status: &ViewStatus) -> bool {
    matches!(status, ViewStatus::Failed(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_failed_detection() {
        assert!(is_failed(&ViewStatus::Failed("denied".to_string())));
        assert!(!is_failed(&ViewStatus::Connecting));
        assert!(!is_failed(&ViewStatus::Live));
    }
}
