//! Portal HTTP API
//!
//! HTTP layer for the investor portal, built with Axum. Browser forms and
//! API clients share the same endpoints: requests that accept `text/html`
//! are redirected back to the dashboard with a notice, everything else
//! gets JSON.
//!
//! # Endpoints
//!
//! ## Pages
//! - `GET /` - Public landing page
//! - `GET /admin` - Admin dashboard (Session Guard)
//! - `GET /admin/login` - Login form
//! - `POST /admin/login` - Sign in
//! - `POST /admin/logout` - Sign out
//!
//! ## Investors
//! - `GET /api/v1/investors` - List investors
//! - `POST /api/v1/investors` - Add an investor
//! - `POST /api/v1/investors/:id/delete` - Remove an investor
//! - `POST /api/v1/investors/:id/password-reset` - Send a reset email
//!
//! ## Messages
//! - `GET /api/v1/messages` - List messages
//! - `POST /api/v1/messages` - Send a message (multipart)
//!
//! ## Documents
//! - `GET /api/v1/documents` - List documents
//! - `POST /api/v1/documents` - Upload a document (multipart)
//! - `POST /api/v1/documents/:id/delete` - Delete a document
//! - `GET /api/v1/uploads/status` - Upload panel state
//!
//! ## Dashboard
//! - `GET /api/v1/stats` - Counters, selectors and controls
//! - `POST /api/v1/recipients/:selector` - Change a recipient selection
//!
//! ## Files
//! - `GET /files/*path` - Download a stored file
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Live dashboard updates
//!
//! # Example
//!
//! ```rust,ignore
//! use investor_portal::api::{serve, ApiConfig, AppState};
//! use investor_portal::portal::PortalSettings;
//! use investor_portal::store::{Backend, LocalBlobStore, MemoryIdentityStore, MemoryRecordStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Backend::new(
//!         Arc::new(MemoryIdentityStore::new()),
//!         Arc::new(MemoryRecordStore::new()),
//!         Arc::new(LocalBlobStore::new("./blobs", "http://localhost:8090")),
//!     );
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(backend, PortalSettings::default(), config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_size;

    let api_routes = Router::new()
        // Investor routes
        .route(
            "/investors",
            get(routes::investors::list_investors).post(routes::investors::create_investor),
        )
        .route("/investors/:id/delete", post(routes::investors::delete_investor))
        .route(
            "/investors/:id/password-reset",
            post(routes::investors::reset_password),
        )
        // Message routes
        .route(
            "/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        // Document routes
        .route(
            "/documents",
            get(routes::documents::list_documents).post(routes::documents::upload_document),
        )
        .route("/documents/:id/delete", post(routes::documents::delete_document))
        .route("/uploads/status", get(routes::documents::upload_status))
        // Dashboard routes
        .route("/stats", get(routes::dashboard::get_stats))
        .route("/recipients/:selector", post(routes::dashboard::select_recipient))
        // Uploads and attachments share one body limit
        .layer(DefaultBodyLimit::max(body_limit));

    let page_routes = Router::new()
        .route("/", get(routes::pages::public_page))
        .route("/admin", get(routes::pages::dashboard_page))
        .route(
            "/admin/login",
            get(routes::pages::login_page).post(routes::pages::login),
        )
        .route("/admin/logout", post(routes::pages::logout))
        .route("/files/*path", get(routes::files::download))
        // WebSocket route
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .merge(page_routes)
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // Configure properly in production
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let dispatcher = state.ws_hub.start_dispatcher();
    let handle = state.clone();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Investor portal listening on {}", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)));

    if let Some(dashboard) = handle.started_dashboard() {
        dashboard.shutdown();
    }
    dispatcher.abort();

    result?;
    tracing::info!("Investor portal shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
