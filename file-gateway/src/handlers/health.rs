use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::AppState;

/// GET /health
///
/// Liveness only; the object store is not contacted.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "file-gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.store.backend_name().to_string(),
    })
}
