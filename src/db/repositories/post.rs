//! Post repository
//!
//! Database operations for blog posts:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! All listings are ordered newest first (published_date descending).

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{BlogPost, Category};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post
    async fn create(&self, post: &BlogPost) -> Result<BlogPost>;

    /// Update an existing post, returning the stored row
    async fn update(&self, post: &BlogPost) -> Result<BlogPost>;

    /// Get post by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    /// List all posts, newest first
    async fn list(&self) -> Result<Vec<BlogPost>>;

    /// List posts in a category, newest first
    async fn list_by_category(&self, category: Category) -> Result<Vec<BlogPost>>;

    /// List the most recent posts, newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<BlogPost>>;

    /// List featured posts, newest first
    async fn list_featured(&self) -> Result<Vec<BlogPost>>;

    /// Check if a slug is already taken
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Check if a slug is taken by a different post
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: &str) -> Result<bool>;

    /// Delete a post, returning the number of rows removed
    async fn delete(&self, id: &str) -> Result<u64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &BlogPost) -> Result<BlogPost> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await
            }
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn update(&self, post: &BlogPost) -> Result<BlogPost> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_post_sqlite(self.pool.as_sqlite().unwrap(), post).await
            }
            DatabaseDriver::Mysql => update_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_by_category(&self, category: Category) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_by_category_sqlite(self.pool.as_sqlite().unwrap(), category).await
            }
            DatabaseDriver::Mysql => {
                list_posts_by_category_mysql(self.pool.as_mysql().unwrap(), category).await
            }
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recent_posts_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => {
                list_recent_posts_mysql(self.pool.as_mysql().unwrap(), limit).await
            }
        }
    }

    async fn list_featured(&self) -> Result<Vec<BlogPost>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_featured_posts_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => list_featured_posts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug, None).await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug, None).await
            }
        }
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug, Some(exclude_id)).await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug, Some(exclude_id)).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const POST_COLUMNS: &str =
    "id, title, slug, excerpt, content, cover_image, category, published_date, author, featured";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &BlogPost) -> Result<BlogPost> {
    sqlx::query(
        r#"
        INSERT INTO posts (id, title, slug, excerpt, content, cover_image, category, published_date, author, featured)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.cover_image)
    .bind(post.category.as_str())
    .bind(post.published_date)
    .bind(&post.author)
    .bind(post.featured)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post.clone())
}

async fn update_post_sqlite(pool: &SqlitePool, post: &BlogPost) -> Result<BlogPost> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, excerpt = ?, content = ?, cover_image = ?,
            category = ?, author = ?, featured = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.cover_image)
    .bind(post.category.as_str())
    .bind(&post.author)
    .bind(post.featured)
    .bind(&post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(pool: &SqlitePool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_posts_by_category_sqlite(
    pool: &SqlitePool,
    category: Category,
) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE category = ? ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .bind(category.as_str())
    .fetch_all(pool)
    .await
    .context("Failed to list posts by category")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_recent_posts_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY published_date DESC LIMIT ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list recent posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_featured_posts_sqlite(pool: &SqlitePool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE featured = 1 ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list featured posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn exists_by_slug_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT 1 FROM posts WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        None => {
            sqlx::query("SELECT 1 FROM posts WHERE slug = ?")
                .bind(slug)
                .fetch_optional(pool)
                .await
        }
    }
    .context("Failed to check slug existence")?;

    Ok(row.is_some())
}

async fn delete_post_sqlite(pool: &SqlitePool, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(result.rows_affected())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<BlogPost> {
    let category: String = row.get("category");
    Ok(BlogPost {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        cover_image: row.get("cover_image"),
        category: Category::from_str(&category)
            .with_context(|| format!("Unknown category in store: {}", category))?,
        published_date: row.get("published_date"),
        author: row.get("author"),
        featured: row.get("featured"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &BlogPost) -> Result<BlogPost> {
    sqlx::query(
        r#"
        INSERT INTO posts (id, title, slug, excerpt, content, cover_image, category, published_date, author, featured)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.cover_image)
    .bind(post.category.as_str())
    .bind(post.published_date)
    .bind(&post.author)
    .bind(post.featured)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post.clone())
}

async fn update_post_mysql(pool: &MySqlPool, post: &BlogPost) -> Result<BlogPost> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, slug = ?, excerpt = ?, content = ?, cover_image = ?,
            category = ?, author = ?, featured = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.cover_image)
    .bind(post.category.as_str())
    .bind(&post.author)
    .bind(post.featured)
    .bind(&post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(post.clone())
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<BlogPost>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_mysql(pool: &MySqlPool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_posts_by_category_mysql(
    pool: &MySqlPool,
    category: Category,
) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE category = ? ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .bind(category.as_str())
    .fetch_all(pool)
    .await
    .context("Failed to list posts by category")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_recent_posts_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY published_date DESC LIMIT ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list recent posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_featured_posts_mysql(pool: &MySqlPool) -> Result<Vec<BlogPost>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE featured = TRUE ORDER BY published_date DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list featured posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn exists_by_slug_mysql(
    pool: &MySqlPool,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let row = match exclude_id {
        Some(id) => {
            sqlx::query("SELECT 1 FROM posts WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(id)
                .fetch_optional(pool)
                .await
        }
        None => {
            sqlx::query("SELECT 1 FROM posts WHERE slug = ?")
                .bind(slug)
                .fetch_optional(pool)
                .await
        }
    }
    .context("Failed to check slug existence")?;

    Ok(row.is_some())
}

async fn delete_post_mysql(pool: &MySqlPool, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(result.rows_affected())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<BlogPost> {
    let category: String = row.get("category");
    Ok(BlogPost {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        cover_image: row.get("cover_image"),
        category: Category::from_str(&category)
            .with_context(|| format!("Unknown category in store: {}", category))?,
        published_date: row.get("published_date"),
        author: row.get("author"),
        featured: row.get("featured"),
    })
}
