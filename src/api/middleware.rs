//! API middleware
//!
//! Authentication and authorization layers plus the shared error envelope.
//! Credentials arrive either as `Authorization: Bearer <token>` or as a
//! `session=` cookie; middleware resolves them once per request and stores
//! both the resolved user and the raw credentials in request extensions so
//! services can re-verify immediately before writes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    AuthService, AuthServiceError, Credentials, PostService, PostServiceError, SessionResolver,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
    pub resolver: Arc<SessionResolver>,
    pub upload_config: Arc<crate::config::UploadConfig>,
    pub session_ttl_days: i64,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Raw credentials extracted from request, kept around so write paths can
/// re-verify them at the moment of the write
#[derive(Debug, Clone)]
pub struct RequestCredentials(pub Credentials);

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

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::new("SESSION_EXPIRED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new("PAYLOAD_TOO_LARGE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" | "SESSION_EXPIRED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(msg) => ApiError::not_found(msg),
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Slug already exists: {}", slug))
            }
            PostServiceError::AuthenticationError(msg) => ApiError::session_expired(msg),
            PostServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            PostServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Post operation failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(e: AuthServiceError) -> Self {
        match e {
            AuthServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            AuthServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AuthServiceError::UserExists(msg) => ApiError::conflict(msg),
            AuthServiceError::RefreshFailed => {
                ApiError::session_expired("Session could not be renewed")
            }
            AuthServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Auth operation failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract credentials from the request headers.
///
/// A bearer token is tried as both a session id and a local token; the
/// session cookie only ever names a hosted session.
pub fn extract_credentials(parts_headers: &axum::http::HeaderMap) -> Credentials {
    if let Some(auth_header) = parts_headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Credentials::bearer(token);
            }
        }
    }

    if let Some(cookie_header) = parts_headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Credentials::session(token);
                    }
                }
            }
        }
    }

    Credentials::default()
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = extract_credentials(request.headers());
    if credentials.is_empty() {
        return Err(ApiError::unauthorized("Missing authentication token"));
    }

    let user = state
        .resolver
        .resolve(&credentials)
        .await
        .ok_or_else(|| ApiError::session_expired("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    request
        .extensions_mut()
        .insert(RequestCredentials(credentials));
    Ok(next.run(request).await)
}

/// Admin authorization middleware (runs after `require_auth`)
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

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

impl<S> FromRequestParts<S> for RequestCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(credentials) = parts.extensions.get::<RequestCredentials>() {
            return Ok(credentials.clone());
        }
        // Outside the auth layers, fall back to reading the headers directly
        Ok(RequestCredentials(extract_credentials(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_extract_bearer_token_fills_both_slots() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.session.as_deref(), Some("abc123"));
        assert_eq!(credentials.token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; session=sess-42; lang=en".parse().unwrap(),
        );

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.session.as_deref(), Some("sess-42"));
        assert!(credentials.token.is_none());
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        headers.insert(header::COOKIE, "session=other".parse().unwrap());

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.session.as_deref(), Some("abc"));
    }

    #[test]
    fn test_extract_nothing() {
        let headers = HeaderMap::new();
        let credentials = extract_credentials(&headers);
        assert!(credentials.is_empty());
    }

    #[test]
    fn test_empty_session_cookie_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "session=".parse().unwrap());
        assert!(extract_credentials(&headers).is_empty());
    }

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::validation_error("Title is required");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "Title is required");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_post_service_error_mapping() {
        let e: ApiError = PostServiceError::DuplicateSlug("hello-world".to_string()).into();
        assert_eq!(e.error.code, "CONFLICT");

        let e: ApiError =
            PostServiceError::AuthenticationError("expired".to_string()).into();
        assert_eq!(e.error.code, "SESSION_EXPIRED");

        let e: ApiError = PostServiceError::NotFound("x".to_string()).into();
        assert_eq!(e.error.code, "NOT_FOUND");
    }
}
