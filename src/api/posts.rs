//! Blog post API handlers
//!
//! Public reads plus the admin write surface. Write handlers pass the raw
//! request credentials through to the service, which re-verifies them right
//! before touching the store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::str::FromStr;

use super::middleware::{ApiError, AppState, RequestCredentials};
use crate::models::{BlogPost, Category, PostInput};

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/posts
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let posts = state.post_service.list().await?;
    Ok(Json(posts))
}

/// GET /api/v1/posts/recent
pub async fn recent_posts(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let posts = state.post_service.get_recent(query.limit.unwrap_or(5)).await?;
    Ok(Json(posts))
}

/// GET /api/v1/posts/featured
pub async fn featured_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let posts = state.post_service.get_featured().await?;
    Ok(Json(posts))
}

/// GET /api/v1/posts/{slug}
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))?;
    Ok(Json(post))
}

/// GET /api/v1/categories/{category}/posts
pub async fn posts_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let category = Category::from_str(&category)
        .map_err(|_| ApiError::not_found(format!("Unknown category: {}", category)))?;
    let posts = state.post_service.get_by_category(category).await?;
    Ok(Json(posts))
}

/// GET /api/v1/admin/posts/{id}
pub async fn get_post_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .post_service
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;
    Ok(Json(post))
}

/// POST /api/v1/admin/posts
///
/// Upsert: input with an id updates, without one creates.
pub async fn save_post(
    State(state): State<AppState>,
    credentials: RequestCredentials,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    let created = !input.is_update();
    let post = state.post_service.save(&credentials.0, input).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(post)))
}

/// DELETE /api/v1/admin/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    credentials: RequestCredentials,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.post_service.delete(&credentials.0, &id).await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Post not found: {}", id)))
    }
}
