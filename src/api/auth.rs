//! Authentication API endpoints
//!
//! - POST /api/auth/profile - Exchange a provider session id for a session token
//! - GET /api/auth/me - Get current user

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::AuthSession;

/// Request body for the login bootstrap
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub session_id: String,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            picture: user.picture,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub session_token: String,
    pub expires_at: String,
}

impl From<AuthSession> for ProfileResponse {
    fn from(auth: AuthSession) -> Self {
        Self {
            user: auth.user.into(),
            session_token: auth.session_token,
            expires_at: auth.expires_at.to_rfc3339(),
        }
    }
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new().route("/profile", post(create_profile_session))
}

/// POST /api/auth/profile - Login bootstrap
///
/// The user record is created on the first login for an email. Every call
/// records a fresh session.
async fn create_profile_session(
    State(state): State<AppState>,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(body) = payload?;
    let auth = state.auth_service.bootstrap(&body.session_id).await?;
    Ok(Json(auth.into()))
}

/// GET /api/auth/me - Get current user
async fn get_current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user.into())
}
