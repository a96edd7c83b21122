//! HTTP API
//!
//! All routes live under `/api/v1`. Public reads need no credentials;
//! admin routes sit behind the `require_auth` + `require_admin` layers.

pub mod auth;
pub mod categories;
pub mod middleware;
pub mod posts;
pub mod upload;

pub use middleware::{ApiError, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the versioned API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Uploads are size-checked in the handler; the transport limit only
    // needs headroom for multipart framing above the configured cap.
    let body_limit = state.upload_config.max_file_size as usize + 64 * 1024;

    let admin_routes = Router::new()
        .route("/admin/posts", post(posts::save_post))
        .route(
            "/admin/posts/{id}",
            get(posts::get_post_by_id).delete(posts::delete_post),
        )
        .route("/admin/uploads", post(upload::upload_cover_image))
        .route("/admin/users", post(auth::create_user))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        // Health check
        .route("/health", get(health))
        // Public post routes
        .route("/posts", get(posts::list_posts))
        .route("/posts/recent", get(posts::recent_posts))
        .route("/posts/featured", get(posts::featured_posts))
        .route("/posts/{slug}", get(posts::get_post_by_slug))
        // Category routes
        .route("/categories", get(categories::list_categories))
        .route("/categories/{category}/posts", get(posts::posts_by_category))
        // Auth routes
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// GET /api/v1/health
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    state
        .pool
        .ping()
        .await
        .map_err(|e| ApiError::internal_error(format!("Database unreachable: {}", e)))?;
    Ok(axum::Json(serde_json::json!({ "status": "ok" })))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, allowing none");
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
