//! Axum HTTP surface.
//!
//! Routes:
//! - `POST /api/transcribe` runs the transcription pipeline
//! - `GET /health` liveness probe

pub mod error;
pub mod handlers;
pub mod trace;

use anyhow::Result;
use axum::routing::{any, get};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::transcribe::TranscriptionPipeline;

pub use error::ErrorResponse;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: TranscriptionPipeline,
}

/// Build the application router
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/transcribe", any(handlers::transcribe))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

/// Bind and serve until SIGINT/SIGTERM
pub async fn serve(config: Config) -> Result<()> {
    let addr: SocketAddr = config.bind_addr()?;
    let pipeline = TranscriptionPipeline::from_config(&config)?;

    let state = Arc::new(AppState {
        config: Arc::new(config),
        pipeline,
    });

    let app = build(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
