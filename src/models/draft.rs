//! Draft model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unpublished, editable precursor to an article, owned by its author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub is_published: bool,
    /// Article created from this draft, once published
    pub published_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft fields accepted on create and update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}
