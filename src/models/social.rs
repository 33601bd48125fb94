//! Follows and bookmarks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: DateTime<Utc>,
}

/// What a bookmark points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum BookmarkTarget {
    Article(i64),
    Post(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub target: BookmarkTarget,
    pub created_at: DateTime<Utc>,
}

/// Bookmark with the target's title (and slug for articles)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkEntry {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub title: String,
    pub slug: Option<String>,
}
