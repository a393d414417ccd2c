//! Investor Portal Server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Settings come from `--config`, the default config locations, or the
//! environment (`PORTAL_*`, see `investor-portal config`).
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand};
use investor_portal::api::{serve, ApiConfig, AppState};
use investor_portal::config::{generate_default_config, Config, LoggingConfig};
use investor_portal::portal::SessionGuard;
use investor_portal::store::{Backend, LocalBlobStore, MemoryIdentityStore, MemoryRecordStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "investor-portal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Investor relations portal with a live admin dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the portal server
    Serve {
        /// Path to a config file (default: search the standard locations)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print or write a default config file
    Config {
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = match config {
                Some(path) => Config::load_with_env(&path)?,
                None => Config::load_default(),
            };
            init_tracing(&config.logging);
            run(config).await
        }
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("investor_portal={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting investor portal v{}", env!("CARGO_PKG_VERSION"));

    let blob_root = config.storage.blob_root();
    tokio::fs::create_dir_all(&blob_root)
        .await
        .with_context(|| format!("creating {}", blob_root.display()))?;
    tracing::info!("Blob directory: {:?}", blob_root);

    let blobs = LocalBlobStore::new(blob_root, config.public_base_url())
        .chunk_size(config.storage.chunk_size);
    let backend = Backend::new(
        Arc::new(MemoryIdentityStore::new()),
        Arc::new(MemoryRecordStore::new()),
        Arc::new(blobs),
    );

    let settings = config.portal.settings();
    match config.portal.bootstrap_admin() {
        Some((email, password)) => {
            let guard = SessionGuard::new(backend.clone(), settings.login_path.clone());
            guard
                .grant_admin(email, password)
                .await
                .map_err(|e| anyhow::anyhow!("seeding administrator {}: {}", email, e))?;
            tracing::info!(email = %email, "Bootstrap administrator ready");
        }
        None => {
            tracing::warn!("No administrator configured (set PORTAL_ADMIN_EMAIL and PORTAL_ADMIN_PASSWORD)")
        }
    }

    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(backend, settings, api_config.clone());

    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Investor portal stopped");
    Ok(())
}
