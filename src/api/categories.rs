//! Category API handlers

use axum::Json;

use crate::models::{Category, CategoryInfo};

/// GET /api/v1/categories
pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(Category::ALL.into_iter().map(CategoryInfo::from).collect())
}
