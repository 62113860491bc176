//! Axum server setup
//!
//! Server skeleton with:
//! - Tracing middleware
//! - Background datastore connectivity check
//! - Graceful shutdown on SIGTERM/Ctrl+C

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use entilayer_core::{
    backend::StoreBackendBuilder,
    error::DocumentStoreError,
    store::DocumentStore,
};
use entilayer_memory::InMemoryStore;

use crate::config::{ServerArgs, StoreKind};
use crate::routes;
use crate::state::AppState;

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Datastore error: {0}")]
    Store(#[from] DocumentStoreError),
}

/// Build the application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::entities::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the document store selected by `args`.
///
/// This only fails on unusable configuration, such as a malformed MongoDB URI.
pub async fn build_store(args: &ServerArgs) -> Result<DocumentStore, DocumentStoreError> {
    match args.store {
        StoreKind::Memory => Ok(DocumentStore::new(InMemoryStore::builder().build().await?)),
        #[cfg(feature = "mongodb")]
        StoreKind::Mongodb => Ok(DocumentStore::new(
            entilayer_mongodb::MongoDbStore::builder(&args.mongodb_uri, &args.database)
                .build()
                .await?,
        )),
        #[cfg(not(feature = "mongodb"))]
        StoreKind::Mongodb => Err(DocumentStoreError::Initialization(
            "this build has no MongoDB support; use --store memory".to_string(),
        )),
    }
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// An unreachable datastore is logged but does not stop the listener from starting;
/// requests that reach the datastore fail individually until it is back.
pub async fn run_server(args: ServerArgs) -> Result<(), ServerError> {
    let store = build_store(&args).await?;

    let probe = store.clone();
    let store_kind = args.store;
    tokio::spawn(async move {
        match probe.ping().await {
            Ok(()) => info!(store = ?store_kind, "Connected to datastore"),
            Err(err) => error!(store = ?store_kind, error = %err, "Failed to connect to datastore"),
        }
    });

    let app = build_router(AppState::from_store(store.clone()));

    let listener = TcpListener::bind(args.bind_addr()).await?;
    let local_addr = listener.local_addr()?;
    info!("Server listening on port {} ({})", local_addr.port(), local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = store.shutdown().await {
        warn!(error = %err, "Datastore did not shut down cleanly");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
