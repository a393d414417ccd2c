//! # Investor Portal
//!
//! Public marketing site plus an administrator dashboard for an investor
//! relations portal: live lists of investors, messages and documents,
//! account creation, messaging with attachments and document uploads with
//! progress.
//!
//! ## Modules
//!
//! - [`store`]: Identity, record and blob store contracts with local backends
//! - [`live`]: Live collection views over standing queries
//! - [`portal`]: Session Guard, dashboard, forms, uploads and recipient selectors
//! - [`site`]: Public page and its scroll/menu behaviour
//! - [`api`]: HTTP server with Axum
//! - [`websocket`]: Live dashboard updates over WebSocket
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use investor_portal::portal::{Dashboard, NoopEvents, PortalSettings};
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
//!
//!     let dashboard =
//!         Dashboard::start(backend, PortalSettings::default(), Arc::new(NoopEvents)).await?;
//!     dashboard.ready().await;
//!     println!("{} investors", dashboard.stats().total_investors);
//!
//!     dashboard.shutdown();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod live;
pub mod portal;
pub mod site;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, PortalConfig};

pub use live::{LiveCollectionView, ViewStatus};

pub use portal::{
    AdminContext, Dashboard, DashboardEvents, PortalError, PortalResult, PortalSettings,
    SessionGuard,
};

pub use store::{Backend, BlobStore, ErrorKind, IdentityStore, RecordStore, StoreError};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};
