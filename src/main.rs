//! ShieldBlog - A marketing blog engine with an authenticated admin surface

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shieldblog::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository},
    },
    services::{AuthService, PostService, SessionResolver},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shieldblog=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ShieldBlog server...");

    // Load configuration (file settings overridden by SHIELDBLOG_* env vars)
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    // Wire up services
    let resolver = Arc::new(SessionResolver::new(
        session_repo.clone(),
        user_repo.clone(),
    ));
    let auth_service = Arc::new(AuthService::new(
        user_repo,
        session_repo,
        &config.auth,
    )?);
    let post_service = Arc::new(PostService::new(post_repo, resolver.clone()));

    let state = AppState {
        pool: pool.clone(),
        auth_service: auth_service.clone(),
        post_service,
        resolver,
        upload_config: Arc::new(config.upload.clone()),
        session_ttl_days: config.auth.session_ttl_days,
    };

    // Sweep expired sessions every hour
    {
        let auth_service = auth_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                if let Err(e) = auth_service.cleanup_expired_sessions().await {
                    tracing::warn!(error = %e, "Session cleanup failed");
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
