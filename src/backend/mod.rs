//! Mock backend
//!
//! A small in-memory server for the collection REST contract:
//! `GET /{resource}`, `POST /{resource}`, `DELETE /{resource}/{id}`, plus
//! `GET /health`. Stands in for the real backend in tests and demos.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod routes;
mod store;

pub use routes::{health_check, HealthResponse};
pub use store::CollectionStore;

use crate::config::ServerConfig;

/// Build the full application router
pub fn app(store: CollectionStore, resource: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest(&format!("/{}", resource.trim_matches('/')), routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(store)
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(
    config: &ServerConfig,
    store: CollectionStore,
    resource: &str,
) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Mock backend listening on {}/{}", addr, resource);

    axum::serve(listener, app(store, resource))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

/// Bind the mock backend to an ephemeral local port
#[cfg(test)]
pub(crate) async fn spawn_local(store: CollectionStore) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(store, "athletes")).await.unwrap();
    });
    addr
}
