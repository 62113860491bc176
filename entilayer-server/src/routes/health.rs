//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// "up" when the datastore answers a ping
    pub datastore: &'static str,
    /// Number of entity types resolved since startup
    pub entity_types: usize,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let datastore = match state.store().ping().await {
        Ok(()) => "up",
        Err(err) => {
            tracing::warn!(error = %err, "Datastore ping failed");
            "down"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        datastore,
        entity_types: state.registry().len().await,
    })
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
