//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! Form bodies are `application/x-www-form-urlencoded` so the dashboard's
//! plain HTML forms and API clients share one contract.

use serde::{Deserialize, Serialize};

use crate::live::ViewStatus;
use crate::portal::{ControlState, DashboardStats, RecipientSelector, UploadState};

// ============================================
// SESSION DTOs
// ============================================

/// Admin login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters of the admin pages
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Outcome text of the previous action
    #[serde(default)]
    pub notice: Option<String>,
}

// ============================================
// MUTATION DTOs
// ============================================

/// Add-investor form
#[derive(Debug, Deserialize)]
pub struct CreateInvestorForm {
    pub name: String,
    pub email: String,
    /// Generated when blank
    #[serde(default)]
    pub password: Option<String>,
}

/// Confirmation of a destructive action
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: bool,
}

/// Selection change on a recipient picker
#[derive(Debug, Deserialize)]
pub struct SelectRecipientForm {
    pub value: String,
}

/// Generic action outcome
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// Status: "ok"
    pub status: String,
    /// Text shown to the operator
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }
}

// ============================================
// LIST DTOs
// ============================================

/// Mirror contents of one live view
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub status: ViewStatus,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, status: ViewStatus) -> Self {
        Self {
            total: items.len(),
            items,
            status,
        }
    }
}

/// Dashboard counters and selector state
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub selectors: Vec<RecipientSelector>,
    pub controls: Vec<ControlState>,
}

/// Upload panel state
#[derive(Debug, Serialize)]
pub struct UploadStatusResponse {
    pub state: UploadState,
    pub control: ControlState,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health of one live view
#[derive(Debug, Serialize)]
pub struct ViewHealth {
    pub view: String,
    pub status: ViewStatus,
}

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "idle"
    pub status: String,
    /// Live views, empty until the dashboard has started
    pub views: Vec<ViewHealth>,
    /// Open WebSocket connections
    pub websocket_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
