//! Vault link API endpoints
//!
//! All routes require a resolved user:
//! - POST /api/vault-links - Create a link
//! - GET /api/vault-links - List the caller's links, newest first
//! - DELETE /api/vault-links/{id} - Delete one of the caller's links

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateVaultLinkInput, VaultLink};

/// Response for a single link
#[derive(Debug, Serialize)]
pub struct VaultLinkResponse {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub access_level: String,
    pub created_at: String,
}

impl From<VaultLink> for VaultLinkResponse {
    fn from(link: VaultLink) -> Self {
        Self {
            id: link.id,
            user_id: link.user_id,
            url: link.url,
            name: link.name,
            access_level: link.access_level.to_string(),
            created_at: link.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Build the vault link router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_links).post(create_link))
        .route("/{id}", delete(delete_link))
}

/// POST /api/vault-links
async fn create_link(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<CreateVaultLinkInput>, JsonRejection>,
) -> Result<Json<VaultLinkResponse>, ApiError> {
    let Json(input) = payload?;

    let link = state.vault_link_service.create(&user, input).await?;
    Ok(Json(link.into()))
}

/// GET /api/vault-links
async fn list_links(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<VaultLinkResponse>>, ApiError> {
    let links = state.vault_link_service.list(&user).await?;
    Ok(Json(links.into_iter().map(Into::into).collect()))
}

/// DELETE /api/vault-links/{id}
async fn delete_link(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.vault_link_service.delete(&user, &id).await?;
    Ok(Json(MessageResponse {
        message: "Link deleted successfully".to_string(),
    }))
}
