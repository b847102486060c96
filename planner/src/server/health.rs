//! Health and readiness endpoints.

use axum::Json;
use serde::Serialize;

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /ready`
///
/// The store is in-memory, so the process is ready as soon as it serves.
pub async fn ready() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
