use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use amora_shared::types::api::HealthResponse;

use crate::ApiState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("amora-discovery", env!("CARGO_PKG_VERSION")))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<ApiState>>) -> String {
    state.app.metrics_handle.render()
}
