use super::{Category, Tag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub content_html: String,
    pub category_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithTaxonomy {
    #[serde(flatten)]
    pub post: Post,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    /// Left empty to derive one from the content.
    #[serde(default)]
    pub summary: Option<String>,
    /// Slug of an existing category.
    #[serde(default)]
    pub category: Option<String>,
    /// Comma separated tag names, created on demand.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Fields left as `None` are not touched. The slug never changes on update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
}
