//! Post service
//!
//! Business logic for blog posts. Reads go straight to the repository;
//! writes validate the form input first, then re-verify the caller's
//! credentials immediately before touching the store, so a session that
//! died since the page was loaded can never produce a write.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repositories::PostRepository;
use crate::models::{BlogPost, Category, PostInput, User};
use crate::services::resolver::{Credentials, SessionResolver};

/// Error types for post operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already in use
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    /// Caller's credentials did not resolve
    #[error("Authentication required: {0}")]
    AuthenticationError(String),

    /// Caller resolved but lacks admin rights
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Derive a URL slug from a post title.
///
/// Lowercases, drops every character that is not alphanumeric, underscore,
/// whitespace, or hyphen, collapses each run of whitespace/underscore/hyphen
/// to a single hyphen, and trims hyphens from both ends.
/// `"Hello World!"` becomes `hello-world`.
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        } else if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        }
        // Everything else is dropped without becoming a separator
    }

    slug
}

/// Post service for public reads and admin writes
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    resolver: Arc<SessionResolver>,
}

impl PostService {
    /// Create a new post service
    pub fn new(post_repo: Arc<dyn PostRepository>, resolver: Arc<SessionResolver>) -> Self {
        Self {
            post_repo,
            resolver,
        }
    }

    /// All posts, newest first
    pub async fn list(&self) -> Result<Vec<BlogPost>, PostServiceError> {
        Ok(self.post_repo.list().await.context("Failed to list posts")?)
    }

    /// Post by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, PostServiceError> {
        Ok(self
            .post_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?)
    }

    /// Post by id
    pub async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>, PostServiceError> {
        Ok(self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?)
    }

    /// Posts in a category, newest first
    pub async fn get_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<BlogPost>, PostServiceError> {
        Ok(self
            .post_repo
            .list_by_category(category)
            .await
            .context("Failed to list posts by category")?)
    }

    /// Most recent posts, newest first
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<BlogPost>, PostServiceError> {
        let limit = limit.clamp(1, 50);
        Ok(self
            .post_repo
            .list_recent(limit)
            .await
            .context("Failed to list recent posts")?)
    }

    /// Featured posts, newest first
    pub async fn get_featured(&self) -> Result<Vec<BlogPost>, PostServiceError> {
        Ok(self
            .post_repo
            .list_featured()
            .await
            .context("Failed to list featured posts")?)
    }

    /// Create or update a post.
    ///
    /// Validation runs before anything else; only then are the caller's
    /// credentials re-verified, and only then does the store get touched.
    /// Creates assign id, slug, and publication date. Updates keep the
    /// stored publication date and re-derive the slug only when the title
    /// actually changed.
    pub async fn save(
        &self,
        credentials: &Credentials,
        input: PostInput,
    ) -> Result<BlogPost, PostServiceError> {
        validate_input(&input)?;
        self.require_admin(credentials).await?;

        if input.is_update() {
            self.update_post(input).await
        } else {
            self.create_post(input).await
        }
    }

    /// Delete a post by id.
    ///
    /// Returns `Ok(false)` when no post matched; authentication problems are
    /// errors, never `false`.
    pub async fn delete(
        &self,
        credentials: &Credentials,
        id: &str,
    ) -> Result<bool, PostServiceError> {
        self.require_admin(credentials).await?;

        let removed = self
            .post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;

        if removed > 0 {
            tracing::info!(post_id = %id, "Post deleted");
        }
        Ok(removed > 0)
    }

    async fn create_post(&self, input: PostInput) -> Result<BlogPost, PostServiceError> {
        let slug = generate_slug(&input.title);
        if slug.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title must contain at least one alphanumeric character".to_string(),
            ));
        }

        if self
            .post_repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug")?
        {
            return Err(PostServiceError::DuplicateSlug(slug));
        }

        let post = BlogPost {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            slug,
            excerpt: input.excerpt,
            content: input.content,
            cover_image: input.cover_image,
            category: input.category,
            published_date: Utc::now(),
            author: input.author,
            featured: input.featured,
        };

        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = %created.id, slug = %created.slug, "Post created");
        Ok(created)
    }

    async fn update_post(&self, input: PostInput) -> Result<BlogPost, PostServiceError> {
        let id = input.id.clone().unwrap_or_default();

        let existing = self
            .post_repo
            .get_by_id(&id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(id.clone()))?;

        // The slug follows the title but never churns on unrelated edits
        let slug = if input.title != existing.title {
            let slug = generate_slug(&input.title);
            if slug.is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title must contain at least one alphanumeric character".to_string(),
                ));
            }
            if self
                .post_repo
                .exists_by_slug_excluding(&slug, &id)
                .await
                .context("Failed to check slug")?
            {
                return Err(PostServiceError::DuplicateSlug(slug));
            }
            slug
        } else {
            existing.slug.clone()
        };

        let post = BlogPost {
            id,
            title: input.title,
            slug,
            excerpt: input.excerpt,
            content: input.content,
            cover_image: input.cover_image,
            category: input.category,
            published_date: existing.published_date,
            author: input.author,
            featured: input.featured,
        };

        let updated = self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        tracing::info!(post_id = %updated.id, slug = %updated.slug, "Post updated");
        Ok(updated)
    }

    async fn require_admin(&self, credentials: &Credentials) -> Result<User, PostServiceError> {
        let user = self.resolver.resolve(credentials).await.ok_or_else(|| {
            PostServiceError::AuthenticationError("Session is missing or expired".to_string())
        })?;

        if !user.is_admin {
            return Err(PostServiceError::Forbidden(
                "Administrator access required".to_string(),
            ));
        }
        Ok(user)
    }
}

fn validate_input(input: &PostInput) -> Result<(), PostServiceError> {
    if input.title.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    if input.excerpt.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Excerpt is required".to_string(),
        ));
    }
    if input.content.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Content is required".to_string(),
        ));
    }
    if input.cover_image.trim().is_empty() {
        return Err(PostServiceError::ValidationError(
            "Cover image is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::repositories::{
        SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::ADMIN_USER_ID;
    use crate::services::auth::AuthService;

    struct Fixture {
        service: PostService,
        auth: AuthService,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let resolver = Arc::new(SessionResolver::new(
            session_repo.clone(),
            user_repo.clone(),
        ));
        let auth = AuthService::new(user_repo, session_repo, &AuthConfig::default())
            .expect("Failed to build auth service");

        Fixture {
            service: PostService::new(SqlxPostRepository::boxed(pool), resolver),
            auth,
        }
    }

    fn admin_credentials() -> Credentials {
        Credentials::bearer(ADMIN_USER_ID)
    }

    fn input(title: &str) -> PostInput {
        PostInput {
            id: None,
            title: title.to_string(),
            excerpt: "A short excerpt".to_string(),
            content: "# Heading\n\nBody text.".to_string(),
            cover_image: "/uploads/cover.jpg".to_string(),
            category: Category::Cybersecurity,
            author: "Jordan Writer".to_string(),
            featured: false,
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_stamps_date() {
        let fixture = setup().await;

        let post = fixture
            .service
            .save(&admin_credentials(), input("Hello World!"))
            .await
            .expect("Save should succeed");

        assert_eq!(post.slug, "hello-world");
        assert!(!post.id.is_empty());
        assert!((Utc::now() - post.published_date).num_seconds() < 5);
    }

    #[tokio::test]
    async fn test_title_change_rederives_slug_keeps_date() {
        let fixture = setup().await;
        let created = fixture
            .service
            .save(&admin_credentials(), input("Hello World!"))
            .await
            .unwrap();

        let mut update = input("Hello, World Again");
        update.id = Some(created.id.clone());
        let updated = fixture
            .service
            .save(&admin_credentials(), update)
            .await
            .expect("Update should succeed");

        assert_eq!(updated.slug, "hello-world-again");
        assert_eq!(updated.published_date, created.published_date);

        let stored = fixture
            .service
            .get_by_id(&created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.slug, "hello-world-again");
        assert_eq!(
            stored.published_date.timestamp(),
            created.published_date.timestamp()
        );
    }

    #[tokio::test]
    async fn test_update_without_title_change_keeps_slug() {
        let fixture = setup().await;
        let created = fixture
            .service
            .save(&admin_credentials(), input("Stable Title"))
            .await
            .unwrap();

        let mut update = input("Stable Title");
        update.id = Some(created.id.clone());
        update.content = "Edited body".to_string();
        let updated = fixture
            .service
            .save(&admin_credentials(), update)
            .await
            .unwrap();

        assert_eq!(updated.slug, created.slug);
        assert_eq!(updated.content, "Edited body");
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let fixture = setup().await;
        let mut update = input("Anything");
        update.id = Some("ghost-id".to_string());

        let result = fixture.service.save(&admin_credentials(), update).await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let fixture = setup().await;
        fixture
            .service
            .save(&admin_credentials(), input("Shared Title"))
            .await
            .unwrap();

        let result = fixture
            .service
            .save(&admin_credentials(), input("Shared Title"))
            .await;
        assert!(matches!(result, Err(PostServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_empty_title_rejected_before_auth() {
        let fixture = setup().await;

        // No credentials at all: were auth checked first, this would be an
        // authentication error. Validation must win.
        let result = fixture
            .service
            .save(&Credentials::default(), input("   "))
            .await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_blank_fields_rejected() {
        let fixture = setup().await;

        let mut no_excerpt = input("Title");
        no_excerpt.excerpt = " ".to_string();
        assert!(matches!(
            fixture.service.save(&admin_credentials(), no_excerpt).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let mut no_content = input("Title");
        no_content.content = "".to_string();
        assert!(matches!(
            fixture.service.save(&admin_credentials(), no_content).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let mut no_cover = input("Title");
        no_cover.cover_image = "".to_string();
        assert!(matches!(
            fixture.service.save(&admin_credentials(), no_cover).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_without_credentials_rejected() {
        let fixture = setup().await;
        let result = fixture
            .service
            .save(&Credentials::default(), input("Valid Title"))
            .await;
        assert!(matches!(
            result,
            Err(PostServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_by_non_admin_forbidden() {
        let fixture = setup().await;
        let user = fixture
            .auth
            .create_user("carol", "password1", false)
            .await
            .unwrap();

        let result = fixture
            .service
            .save(&Credentials::bearer(&user.id), input("Valid Title"))
            .await;
        assert!(matches!(result, Err(PostServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_returns_false() {
        let fixture = setup().await;
        let removed = fixture
            .service
            .delete(&admin_credentials(), "never-existed")
            .await
            .expect("Delete should not error");
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_delete_existing_returns_true() {
        let fixture = setup().await;
        let post = fixture
            .service
            .save(&admin_credentials(), input("Doomed"))
            .await
            .unwrap();

        assert!(fixture
            .service
            .delete(&admin_credentials(), &post.id)
            .await
            .unwrap());
        assert!(fixture
            .service
            .get_by_id(&post.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_without_credentials_is_error_not_false() {
        let fixture = setup().await;
        let result = fixture
            .service
            .delete(&Credentials::default(), "some-id")
            .await;
        assert!(matches!(
            result,
            Err(PostServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_ordering_and_clamp() {
        let fixture = setup().await;
        for i in 0..3 {
            fixture
                .service
                .save(&admin_credentials(), input(&format!("Post number {}", i)))
                .await
                .unwrap();
        }

        let recent = fixture.service.get_recent(100).await.unwrap();
        assert_eq!(recent.len(), 3);
        for pair in recent.windows(2) {
            assert!(pair[0].published_date >= pair[1].published_date);
        }

        let one = fixture.service.get_recent(0).await.unwrap();
        assert_eq!(one.len(), 1, "Limit is clamped to at least 1");
    }

    #[test]
    fn test_generate_slug_basic() {
        assert_eq!(generate_slug("Hello World!"), "hello-world");
        assert_eq!(generate_slug("Hello, World Again"), "hello-world-again");
    }

    #[test]
    fn test_generate_slug_collapses_separators() {
        assert_eq!(generate_slug("a  _  b---c"), "a-b-c");
        assert_eq!(generate_slug("  spaced out  "), "spaced-out");
    }

    #[test]
    fn test_generate_slug_strips_punctuation() {
        assert_eq!(generate_slug("What's New? (2026 Edition)"), "whats-new-2026-edition");
        assert_eq!(generate_slug("C++ & Rust: A Story"), "c-rust-a-story");
    }

    #[test]
    fn test_generate_slug_degenerate_titles() {
        assert_eq!(generate_slug(""), "");
        assert_eq!(generate_slug("!!!"), "");
        assert_eq!(generate_slug("---"), "");
        assert_eq!(generate_slug("日本語"), "");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_slug_is_url_safe(title in ".{0,80}") {
            let slug = generate_slug(&title);
            prop_assert!(slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn prop_slug_is_idempotent(title in ".{0,80}") {
            let slug = generate_slug(&title);
            prop_assert_eq!(generate_slug(&slug), slug.clone());
        }

        #[test]
        fn prop_slug_case_insensitive(title in "[a-zA-Z ]{1,40}") {
            prop_assert_eq!(
                generate_slug(&title),
                generate_slug(&title.to_uppercase())
            );
        }
    }
}
