//! Blog post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// Blog post entity.
///
/// `slug` is derived from the title and unique across the store.
/// `published_date` is stamped once at creation and never rewritten by
/// updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    /// Unique identifier (uuid, assigned at creation)
    pub id: String,
    /// Post title
    pub title: String,
    /// URL slug derived from the title (unique)
    pub slug: String,
    /// Short summary shown in listings
    pub excerpt: String,
    /// Full body, Markdown stored verbatim
    pub content: String,
    /// Cover image URL or path
    pub cover_image: String,
    /// Category
    pub category: Category,
    /// Publication timestamp (set at creation)
    pub published_date: DateTime<Utc>,
    /// Author display name
    pub author: String,
    /// Whether the post is featured on the front page
    pub featured: bool,
}

/// Admin post-form payload for create and update.
///
/// An empty or missing `id` means create; a present `id` means update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: String,
    pub category: Category,
    pub author: String,
    #[serde(default)]
    pub featured: bool,
}

impl PostInput {
    /// Whether this payload targets an existing post.
    pub fn is_update(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
