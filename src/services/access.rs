//! Access guard
//!
//! Turns a bearer session token into the user it belongs to, or into the
//! precise reason it cannot. Every user-scoped operation goes through here
//! first. Resolution never writes: expired sessions are left in the store.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::User;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Why a token did not resolve to a user
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Session token required")]
    MissingToken,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session expired")]
    SessionExpired,

    /// The session points at a user record that no longer exists
    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Resolves session tokens against the session and user stores
pub struct AccessGuard {
    session_repo: Arc<dyn SessionRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl AccessGuard {
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            session_repo,
            user_repo,
        }
    }

    /// Resolve a token to its user as of now.
    pub async fn resolve(&self, token: Option<&str>) -> Result<User, AccessError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve a token to its user as of `now`.
    ///
    /// A session is still valid at the exact instant it expires.
    pub async fn resolve_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User, AccessError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AccessError::MissingToken),
        };

        let session = self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to look up session")?
            .ok_or(AccessError::InvalidToken)?;

        if session.is_expired_at(now) {
            tracing::debug!(session_id = %session.id, expires_at = %session.expires_at, "Rejected expired session");
            return Err(AccessError::SessionExpired);
        }

        self.user_repo
            .get_by_id(&session.user_id)
            .await
            .context("Failed to look up session user")?
            .ok_or_else(|| {
                tracing::warn!(session_id = %session.id, user_id = %session.user_id, "Session references a missing user");
                AccessError::UserNotFound
            })
    }
}
