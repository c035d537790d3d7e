//! Auth bootstrap service
//!
//! Turns a provider session id into a local user and session:
//! - the identity provider is asked for the profile and session token
//! - the user is created on first login for an email, reused afterwards
//! - a new session is recorded on every call
//!
//! Profile fields from later logins are not written back; the first login
//! for an email decides name and picture.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{NewUserProfile, Session, User};
use crate::services::identity::{IdentityError, IdentityProvider, ProviderSession};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Default session expiration time in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for login bootstrap
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider refused the session id
    #[error("Invalid session ID")]
    InvalidSessionId,

    /// The provider could not be reached
    #[error("Authentication service unavailable")]
    AuthServiceUnavailable,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(_) => AuthError::InvalidSessionId,
            IdentityError::Unavailable(_) => AuthError::AuthServiceUnavailable,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login bootstrap over the identity provider and the local stores
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl AuthService {
    /// Create a new auth service with the default 7-day session lifetime
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(
            identity,
            user_repo,
            session_repo,
            DEFAULT_SESSION_EXPIRATION_DAYS,
        )
    }

    /// Create a new auth service with custom session expiration
    pub fn with_session_expiration(
        identity: Arc<dyn IdentityProvider>,
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            identity,
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Exchange a provider session id for a local session.
    ///
    /// # Errors
    ///
    /// - `InvalidSessionId` if the provider rejects the id
    /// - `AuthServiceUnavailable` if the provider cannot be reached
    /// - `InternalError` for database errors or a session lifetime that
    ///   does not fit in a timestamp
    pub async fn bootstrap(&self, session_id: &str) -> Result<AuthSession, AuthError> {
        let provided = self.identity.exchange(session_id).await?;
        let now = Utc::now();
        let ttl = self.session_ttl(now)?;

        let user = self.find_or_create_user(&provided, now).await?;

        let session = Session::new(user.id.clone(), provided.session_token, now, ttl);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "User signed in");

        Ok(AuthSession {
            user,
            session_token: session.session_token,
            expires_at: session.expires_at,
        })
    }

    /// Session lifetime starting at `now`, if the expiry is representable
    fn session_ttl(&self, now: DateTime<Utc>) -> Result<Duration, AuthError> {
        Duration::try_days(self.session_expiration_days)
            .filter(|ttl| now.checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                AuthError::InternalError(anyhow::anyhow!(
                    "Session lifetime of {} days is out of range",
                    self.session_expiration_days
                ))
            })
    }

    async fn find_or_create_user(
        &self,
        provided: &ProviderSession,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        if let Some(existing) = self
            .user_repo
            .get_by_email(&provided.email)
            .await
            .context("Failed to check email")?
        {
            return Ok(existing);
        }

        let user = User::new(
            NewUserProfile {
                email: provided.email.clone(),
                name: provided.name.clone(),
                picture: provided.picture.clone(),
            },
            now,
        );

        match self.user_repo.create(&user).await {
            Ok(created) => {
                tracing::info!(user_id = %created.id, "Created user on first login");
                Ok(created)
            }
            // A concurrent first login for the same email may have won the insert.
            Err(err) => self
                .user_repo
                .get_by_email(&provided.email)
                .await
                .context("Failed to check email")?
                .ok_or_else(|| AuthError::InternalError(err.context("Failed to create user"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Identity provider answering from a fixed table of session ids.
    ///
    /// `"down"` simulates an unreachable provider; unknown ids are rejected.
    #[derive(Default)]
    pub(crate) struct StubIdentityProvider {
        sessions: HashMap<String, ProviderSession>,
    }

    impl StubIdentityProvider {
        pub(crate) fn with(mut self, session_id: &str, email: &str, name: &str, token: &str) -> Self {
            self.sessions.insert(
                session_id.to_string(),
                ProviderSession {
                    email: email.to_string(),
                    name: name.to_string(),
                    picture: None,
                    session_token: token.to_string(),
                },
            );
            self
        }
    }

    #[async_trait]
    impl IdentityProvider for StubIdentityProvider {
        async fn exchange(&self, session_id: &str) -> Result<ProviderSession, IdentityError> {
            if session_id == "down" {
                return Err(IdentityError::Unavailable("connection refused".to_string()));
            }
            self.sessions
                .get(session_id)
                .cloned()
                .ok_or(IdentityError::Rejected(401))
        }
    }

    struct Fixture {
        service: AuthService,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    }

    async fn setup(provider: StubIdentityProvider) -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool);
        Fixture {
            service: AuthService::new(Arc::new(provider), users.clone(), sessions.clone()),
            users,
            sessions,
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_user_and_session() {
        let fixture = setup(StubIdentityProvider::default().with("abc", "a@x.com", "A", "tok1")).await;

        let before = Utc::now();
        let auth = fixture.service.bootstrap("abc").await.expect("login should succeed");
        let after = Utc::now();

        assert_eq!(auth.user.email, "a@x.com");
        assert_eq!(auth.user.name, "A");
        assert_eq!(auth.session_token, "tok1");
        assert_eq!(fixture.users.count().await.unwrap(), 1);
        assert_eq!(fixture.sessions.count_by_user(&auth.user.id).await.unwrap(), 1);

        let session = fixture.sessions.get_by_token("tok1").await.unwrap().unwrap();
        assert_eq!(session.expires_at, auth.expires_at);
        assert_eq!(session.expires_at - session.created_at, Duration::days(7));
        assert!(session.created_at >= before && session.created_at <= after);
    }

    #[tokio::test]
    async fn test_repeated_login_reuses_user_and_adds_session() {
        let provider = StubIdentityProvider::default()
            .with("first", "a@x.com", "A", "tok1")
            .with("second", "a@x.com", "Renamed", "tok2");
        let fixture = setup(provider).await;

        let first = fixture.service.bootstrap("first").await.unwrap();
        let second = fixture.service.bootstrap("second").await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        // Profile fields from the first login are kept
        assert_eq!(second.user.name, "A");
        assert_eq!(fixture.users.count().await.unwrap(), 1);
        assert_eq!(fixture.sessions.count_by_user(&first.user.id).await.unwrap(), 2);

        // Both sessions stay valid independently
        assert!(fixture.sessions.get_by_token("tok1").await.unwrap().is_some());
        assert!(fixture.sessions.get_by_token("tok2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_session_id() {
        let fixture = setup(StubIdentityProvider::default()).await;

        let result = fixture.service.bootstrap("unknown").await;
        assert!(matches!(result, Err(AuthError::InvalidSessionId)));
        assert_eq!(fixture.users.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provider_unavailable() {
        let fixture = setup(StubIdentityProvider::default()).await;

        let result = fixture.service.bootstrap("down").await;
        assert!(matches!(result, Err(AuthError::AuthServiceUnavailable)));
        assert_eq!(fixture.users.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_session_expiration() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = AuthService::with_session_expiration(
            Arc::new(StubIdentityProvider::default().with("abc", "a@x.com", "A", "tok1")),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            1,
        );

        let auth = service.bootstrap("abc").await.unwrap();
        let session = SqlxSessionRepository::new(pool)
            .get_by_token("tok1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.expires_at - session.created_at, Duration::days(1));
    }

    #[tokio::test]
    async fn test_out_of_range_session_expiration_fails_without_panic() {
        for days in [100_000_000, i64::MAX] {
            let pool = create_test_pool().await.unwrap();
            migrations::run_migrations(&pool).await.unwrap();
            let users = SqlxUserRepository::boxed(pool.clone());
            let sessions = SqlxSessionRepository::boxed(pool);
            let service = AuthService::with_session_expiration(
                Arc::new(StubIdentityProvider::default().with("abc", "a@x.com", "A", "tok1")),
                users.clone(),
                sessions.clone(),
                days,
            );

            let result = service.bootstrap("abc").await;
            assert!(matches!(result, Err(AuthError::InternalError(_))), "days = {}", days);
            assert_eq!(users.count().await.unwrap(), 0);
            assert!(sessions.get_by_token("tok1").await.unwrap().is_none());
        }
    }
}
