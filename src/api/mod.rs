//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for VaultLinks:
//! - Auth API endpoints (login bootstrap, current user)
//! - Vault link API endpoints
//! - Health check

pub mod auth;
pub mod health;
pub mod middleware;
pub mod vault_links;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a resolved user)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/vault-links", vault_links::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(health::router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
///
/// `*` allows any origin without credentials; any other value is used as
/// the single allowed origin, with credentials.
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let methods = [Method::GET, Method::POST, Method::DELETE];
    let cors = if cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
    };

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
