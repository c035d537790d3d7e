//! Identity provider client
//!
//! Exchanges a provider-issued session id for the user's profile and a
//! long-lived session token. The provider is an external HTTPS endpoint that
//! reads the session id from the `X-Session-ID` header.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::AuthConfig;

const SESSION_ID_HEADER: &str = "X-Session-ID";

/// Profile and token returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSession {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

/// Failures talking to the identity provider
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider answered but refused the session id
    #[error("Identity provider rejected the session id (status {0})")]
    Rejected(u16),

    /// The provider could not be reached or sent an unreadable answer
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of user identities, keyed by an opaque provider session id
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, session_id: &str) -> Result<ProviderSession, IdentityError>;
}

/// `IdentityProvider` backed by the provider's HTTP session-data endpoint.
///
/// Holds one `reqwest::Client` for the whole process.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityProvider {
    /// Build a client calling `endpoint`, bounding each call by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vaultlinks/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, IdentityError> {
        Self::new(config.provider_url.clone(), config.provider_timeout())
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange(&self, session_id: &str) -> Result<ProviderSession, IdentityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(SESSION_ID_HEADER, session_id)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Identity provider request failed: {}", e);
                IdentityError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Identity provider rejected session id with {}", status);
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        response.json::<ProviderSession>().await.map_err(|e| {
            tracing::warn!("Identity provider sent an unreadable profile: {}", e);
            IdentityError::Unavailable(format!("Invalid provider response: {}", e))
        })
    }
}
