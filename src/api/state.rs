//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use super::error::{ApiError, ApiResult};
use crate::portal::{Dashboard, DashboardEvents, PortalSettings, SessionGuard};
use crate::store::Backend;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Identity, record and blob stores
    pub backend: Backend,
    /// Portal branding and form rules
    pub settings: Arc<PortalSettings>,
    /// Admin gate
    pub guard: Arc<SessionGuard>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for real-time streaming
    pub ws_hub: Arc<ConnectionHub>,
    /// Started on the first admitted request
    dashboard: Arc<OnceCell<Arc<Dashboard>>>,
}

impl AppState {
    pub fn new(backend: Backend, settings: PortalSettings, config: ApiConfig) -> Self {
        Self::with_ws_config(backend, settings, config, HubConfig::default())
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(
        backend: Backend,
        settings: PortalSettings,
        config: ApiConfig,
        hub_config: HubConfig,
    ) -> Self {
        Self {
            guard: Arc::new(SessionGuard::new(backend.clone(), settings.login_path.clone())),
            backend,
            settings: Arc::new(settings),
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(hub_config)),
            dashboard: Arc::new(OnceCell::new()),
        }
    }

    /// The process-wide dashboard, started on first use
    pub async fn dashboard(&self) -> ApiResult<Arc<Dashboard>> {
        let dashboard = self
            .dashboard
            .get_or_try_init(|| async {
                let events: Arc<dyn DashboardEvents> = self.ws_hub.clone();
                let dashboard =
                    Dashboard::start(self.backend.clone(), (*self.settings).clone(), events).await?;
                dashboard.ready().await;
                Ok::<_, ApiError>(Arc::new(dashboard))
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Dashboard failed to start");
                ApiError::ServiceUnavailable(format!("dashboard unavailable: {}", e))
            })?;
        Ok(Arc::clone(dashboard))
    }

    /// The dashboard if it has been started
    pub fn started_dashboard(&self) -> Option<Arc<Dashboard>> {
        self.dashboard.get().cloned()
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum request body size in bytes (bounds uploads)
    pub max_body_size: usize,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            max_body_size: 50 * 1024 * 1024, // 50MB
            secure_cookies: false,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
