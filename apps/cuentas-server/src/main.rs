//! # Cuentas de Cobro Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  init_tracing()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServerConfig::load()          defaults → cuentas.toml → CUENTAS_*     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  open_store(backend, data_dir) counter.json | cuentas.db               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HtmlDocumentRenderer          templates/ + PDF engine command         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceService ──► axum::serve(...) until Ctrl+C / SIGTERM            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cuentas_core::InvoiceService;
use cuentas_render::{CommandPdfEngine, HtmlDocumentRenderer, TemplateLibrary};
use cuentas_server::{app, AppState, ServerConfig};
use cuentas_store::open_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Cuentas de Cobro server...");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.bind_address(),
        backend = %config.storage.backend,
        data_dir = %config.storage.data_dir.display(),
        template = %config.render.template,
        pdf_command = %config.render.pdf_command,
        "Configuration loaded"
    );

    let store = open_store(config.storage.backend, &config.storage.data_dir)
        .await
        .context("Failed to open the invoice counter")?;

    let engine = CommandPdfEngine::new(config.render.pdf_command.as_str())
        .with_timeout(config.render.timeout());
    let renderer = HtmlDocumentRenderer::new(
        TemplateLibrary::new(&config.render.templates_dir),
        absolute(&config.render.base_dir),
        engine,
    )
    .with_template(config.render.template.as_str());

    let assets = absolute(&config.render.assets_dir);
    let service = InvoiceService::new(store, Arc::new(renderer))
        .with_assets_path(assets.to_string_lossy());

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber (RUST_LOG, default info).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cuentas=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolves a configured path against the working directory.
fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
