//! Authentication API handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::middleware::{ApiError, AppState, AuthenticatedUser, RequestCredentials};
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age_secs
    )
}

fn clear_session_cookie() -> String {
    "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0".to_string()
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    let mut headers = HeaderMap::new();
    if outcome.hosted {
        // Hosted sessions also travel as a cookie so browser navigation
        // stays authenticated without a token header
        let max_age = state.session_ttl_days * 24 * 60 * 60;
        if let Ok(value) = session_cookie(&outcome.token, max_age).parse() {
            headers.insert(header::SET_COOKIE, value);
        }
    }

    Ok((
        headers,
        Json(LoginResponse {
            user: outcome.user,
            token: outcome.token,
        }),
    ))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    credentials: RequestCredentials,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = credentials.0.session.as_deref() {
        state.auth_service.logout(token).await?;
    }

    let mut headers = HeaderMap::new();
    if let Ok(value) = clear_session_cookie().parse() {
        headers.insert(header::SET_COOKIE, value);
    }

    Ok((StatusCode::NO_CONTENT, headers))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    credentials: RequestCredentials,
) -> Result<Json<User>, ApiError> {
    let token = credentials
        .0
        .session
        .as_deref()
        .or(credentials.0.token.as_deref())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?
        .to_string();

    let user = state.auth_service.refresh(&token).await?;
    Ok(Json(user))
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .auth_service
        .create_user(&request.username, &request.password, request.is_admin)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("abc-123", 604800);
        assert_eq!(
            cookie,
            "session=abc-123; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800"
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.ends_with("Max-Age=0"));
    }

    #[test]
    fn test_login_request_deserialization() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username":"admin","password":"admin123"}"#).unwrap();
        assert_eq!(request.username, "admin");
        assert_eq!(request.password, "admin123");
    }

    #[test]
    fn test_create_user_request_defaults() {
        let request: CreateUserRequest =
            serde_json::from_str(r#"{"username":"bob","password":"password1"}"#).unwrap();
        assert!(!request.is_admin);
    }
}
