//! # Query Facade
//!
//! Dashboard-facing read endpoint.
//!
//! Serves `GET /bins` as the merged view of durable bin metadata and the
//! cached latest readings. Metadata is read fresh from the store on every
//! request (only telemetry is cached), and the handler is read-only with
//! no side effects beyond cache pruning during the merge.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::cache::{MergedBinView, TelemetryCache};
use crate::store::MetadataStore;

/// Shared state of the read path
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetadataStore>,
    pub cache: Arc<TelemetryCache>,
}

/// Build the dashboard router
///
/// CORS is wide open: the dashboard front-end is served from a different
/// origin than this bridge.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bins", get(list_bins))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `GET /bins`: ordered sequence of merged bin views
async fn list_bins(
    State(state): State<AppState>,
) -> Result<Json<Vec<MergedBinView>>, StatusCode> {
    let metadata = state.store.get().map_err(|e| {
        error!("metadata snapshot unreadable: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(state.cache.merged_with(&metadata)))
}
