//! Docmask Server
//!
//! Stores redaction rectangles against documents, serves masked page views
//! per viewer, bakes permanent redactions into exports and extracts text from
//! user-drawn regions.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docmask_server::config::Config;
use docmask_server::routes;
use docmask_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "docmask_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Docmask Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Document root: {}", config.storage.document_root);
    tracing::info!(
        "Render scale: {}, OCR provider: {:?}",
        config.render.render_scale,
        config.ocr.provider
    );

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid SERVER_HOST {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    // Create application state
    let app_state = AppState::from_config(config)
        .await
        .context("Failed to initialize application state")?;

    if !app_state.ocr().is_available().await {
        tracing::warn!(
            "OCR provider {:?} is not available; region text requests will fail",
            app_state.ocr().provider_type()
        );
    }

    let sweeper = app_state.spawn_session_sweeper();
    let app = routes::app(app_state.clone());

    // Start server with graceful shutdown
    tracing::info!("Docmask Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.shutdown();
    if let Err(e) = sweeper.await {
        tracing::warn!("Session sweeper ended abnormally: {}", e);
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
