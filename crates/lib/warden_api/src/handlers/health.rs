//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /api/v1/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: warden_core::version(),
    })
}
