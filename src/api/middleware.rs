//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its status mapping
//! - Authentication (session token extraction and access guard)

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    AccessError, AccessGuard, AuthError, AuthService, VaultLinkError, VaultLinkService,
};

/// Name of the query parameter and cookie carrying the session token
pub const SESSION_TOKEN_PARAM: &str = "session_token";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub access_guard: Arc<AccessGuard>,
    pub auth_service: Arc<AuthService>,
    pub vault_link_service: Arc<VaultLinkService>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// HTTP status for this error's code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let reason = match &err {
            AccessError::MissingToken => "missing_token",
            AccessError::InvalidToken => "invalid_token",
            AccessError::SessionExpired => "session_expired",
            AccessError::UserNotFound => "user_not_found",
            AccessError::InternalError(e) => {
                tracing::error!("Session validation failed: {:#}", e);
                return ApiError::internal_error("Session validation failed");
            }
        };
        ApiError::with_details("UNAUTHORIZED", err.to_string(), json!({ "reason": reason }))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidSessionId => ApiError::unauthorized(err.to_string()),
            // Reported as a plain server error to clients.
            AuthError::AuthServiceUnavailable => ApiError::service_unavailable(err.to_string()),
            AuthError::InternalError(e) => {
                tracing::error!("Login failed: {:#}", e);
                ApiError::internal_error("Login failed")
            }
        }
    }
}

impl From<VaultLinkError> for ApiError {
    fn from(err: VaultLinkError) -> Self {
        match err {
            VaultLinkError::ValidationError { field, message } => {
                ApiError::with_details("VALIDATION_ERROR", message, json!({ "field": field }))
            }
            VaultLinkError::NotFound => ApiError::not_found("Link not found"),
            VaultLinkError::InternalError(e) => {
                tracing::error!("Vault link operation failed: {:#}", e);
                ApiError::internal_error("Vault link operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::validation_error(rejection.body_text())
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    session_token: Option<String>,
}

/// Extract session token from a request
///
/// Looks at the bearer header, then the `session_token` query parameter,
/// then the `session_token` cookie.
pub fn extract_session_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    if let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(uri) {
        if let Some(token) = query.session_token.filter(|t| !t.is_empty()) {
            return Some(token);
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_TOKEN_PARAM)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

/// Authentication middleware
///
/// Runs the access guard and stores the resolved user in the request
/// extensions for `AuthenticatedUser` to pick up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers(), request.uri());

    let user = state.access_guard.resolve(token.as_deref()).await.map_err(|e| {
        tracing::debug!("Rejected request to {}: {}", request.uri().path(), e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, value.parse().unwrap());
        map
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let uri: Uri = "/api/vault-links".parse().unwrap();
        let map = headers(header::AUTHORIZATION, "Bearer test-token-123");
        assert_eq!(extract_session_token(&map, &uri), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_query() {
        let uri: Uri = "/api/vault-links?foo=1&session_token=tok1".parse().unwrap();
        assert_eq!(extract_session_token(&HeaderMap::new(), &uri), Some("tok1".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let uri: Uri = "/api/auth/me".parse().unwrap();
        let map = headers(header::COOKIE, "theme=dark; session_token=cookie-token");
        assert_eq!(extract_session_token(&map, &uri), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let uri: Uri = "/api/vault-links?session_token=query-token".parse().unwrap();
        let map = headers(header::AUTHORIZATION, "Bearer bearer-token");
        assert_eq!(extract_session_token(&map, &uri), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_empty_bearer_falls_through() {
        let uri: Uri = "/api/vault-links?session_token=tok1".parse().unwrap();
        let map = headers(header::AUTHORIZATION, "Bearer ");
        assert_eq!(extract_session_token(&map, &uri), Some("tok1".to_string()));

        let uri: Uri = "/api/vault-links?session_token=".parse().unwrap();
        let mut map = headers(header::AUTHORIZATION, "Bearer   ");
        map.insert(header::COOKIE, "session_token=cookie-token".parse().unwrap());
        assert_eq!(extract_session_token(&map, &uri), Some("cookie-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        let uri: Uri = "/api/vault-links".parse().unwrap();
        let map = headers(header::AUTHORIZATION, "Basic invalid");
        assert!(extract_session_token(&map, &uri).is_none());
    }

    #[test]
    fn test_access_errors_map_to_unauthorized() {
        for (err, reason) in [
            (AccessError::MissingToken, "missing_token"),
            (AccessError::InvalidToken, "invalid_token"),
            (AccessError::SessionExpired, "session_expired"),
            (AccessError::UserNotFound, "user_not_found"),
        ] {
            let api: ApiError = err.into();
            assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(api.error.details, Some(json!({ "reason": reason })));
        }
    }

    #[test]
    fn test_auth_errors_status() {
        assert_eq!(ApiError::from(AuthError::InvalidSessionId).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::AuthServiceUnavailable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_vault_link_errors_status() {
        let validation = ApiError::from(VaultLinkError::ValidationError {
            field: "url",
            message: "URL must start with http or https".to_string(),
        });
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(validation.error.details, Some(json!({ "field": "url" })));

        assert_eq!(ApiError::from(VaultLinkError::NotFound).status(), StatusCode::NOT_FOUND);
    }
}
