//! facereg-api - Face registration and recognition relay server
//!
//! Persists face encodings, relays frames to the inference service, bridges
//! chat to the chat service, and pushes results over a WebSocket.

use anyhow::{Context, Result};
use clap::Parser;
use facereg_api::cli::Args;
use facereg_api::services::{ChatLink, InferenceClient};
use facereg_api::{build_router, cors_layer, db, AppState};
use facereg_common::config::{load_toml_config, ServiceConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "facereg_api=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.log_level.as_deref() {
        Some(directive) => tracing_subscriber::EnvFilter::new(directive),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting facereg-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml = load_toml_config(args.config.as_deref()).context("Failed to load config")?;
    let config = ServiceConfig::resolve(args.into_overrides(), toml);

    info!("Database path: {}", config.database_path.display());
    let pool = db::init_database_pool(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let inference = InferenceClient::new(config.inference_url.clone(), config.upstream_timeout)
        .context("Failed to build inference client")?;
    info!("Inference service: {}", inference.base_url());

    // The server runs without chat if the chat service is down at start
    let chat = match config.chat_url.as_deref() {
        Some(url) => match ChatLink::connect(url).await {
            Ok(link) => Some(link),
            Err(e) => {
                error!("Chat service unavailable at {}: {}", url, e);
                None
            }
        },
        None => {
            warn!("No chat service configured, chat is disabled");
            None
        }
    };

    let state = AppState::new(pool, inference, chat.clone());
    let app = build_router(state).layer(cors_layer(&config.frontend_url));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("facereg-api listening on http://{}", addr);
    info!("Allowed origin: {}", config.frontend_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(chat) = chat {
        chat.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
