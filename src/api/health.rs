//! Health check endpoint
//!
//! - GET /api/health - Service and database status

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::config::DatabaseDriver;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub driver: DatabaseDriver,
}

/// Build the health router
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /api/health
///
/// Answers 503 when the database does not respond to a ping.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let driver = state.pool.driver();
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "ok",
                driver,
            }),
        ),
        Err(e) => {
            tracing::warn!("Database ping failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unavailable",
                    driver,
                }),
            )
        }
    }
}
