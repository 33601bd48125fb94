//! Bookmark repository
//!
//! A bookmark points at exactly one article or one community post.

use crate::db::{sqlite, DynDatabasePool};
use crate::models::{Bookmark, BookmarkEntry, BookmarkTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Add a bookmark; false when it already existed
    async fn add(&self, user_id: i64, target: BookmarkTarget) -> Result<bool>;

    /// Remove a bookmark; false when there was none
    async fn remove(&self, user_id: i64, target: BookmarkTarget) -> Result<bool>;

    async fn exists(&self, user_id: i64, target: BookmarkTarget) -> Result<bool>;

    /// Bookmarks with target titles, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookmarkEntry>>;
}

pub struct SqlxBookmarkRepository {
    pool: DynDatabasePool,
}

impl SqlxBookmarkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookmarkRepository> {
        Arc::new(Self::new(pool))
    }
}

/// (column, id) for the target's foreign key
fn target_column(target: BookmarkTarget) -> (&'static str, i64) {
    match target {
        BookmarkTarget::Article(id) => ("article_id", id),
        BookmarkTarget::Post(id) => ("post_id", id),
    }
}

#[async_trait]
impl BookmarkRepository for SqlxBookmarkRepository {
    async fn add(&self, user_id: i64, target: BookmarkTarget) -> Result<bool> {
        let (column, id) = target_column(target);
        let sql = format!(
            "INSERT OR IGNORE INTO bookmarks (user_id, {}, created_at) VALUES (?, ?, ?)",
            column
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(id)
            .bind(Utc::now())
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to add bookmark")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: i64, target: BookmarkTarget) -> Result<bool> {
        let (column, id) = target_column(target);
        let sql = format!("DELETE FROM bookmarks WHERE user_id = ? AND {} = ?", column);
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to remove bookmark")?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, user_id: i64, target: BookmarkTarget) -> Result<bool> {
        let (column, id) = target_column(target);
        let sql = format!(
            "SELECT COUNT(*) as count FROM bookmarks WHERE user_id = ? AND {} = ?",
            column
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_one(sqlite(&self.pool)?)
            .await
            .context("Failed to check bookmark")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookmarkEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.article_id, b.post_id, b.created_at,
                   COALESCE(a.title, cp.title, '') AS title, a.slug AS slug
            FROM bookmarks b
            LEFT JOIN articles a ON a.id = b.article_id
            LEFT JOIN community_posts cp ON cp.id = b.post_id
            WHERE b.user_id = ?
            ORDER BY b.created_at DESC, b.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(sqlite(&self.pool)?)
        .await
        .context("Failed to list bookmarks")?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let article_id: Option<i64> = row.get("article_id");
                let post_id: Option<i64> = row.get("post_id");
                let target = match (article_id, post_id) {
                    (Some(id), _) => BookmarkTarget::Article(id),
                    (None, Some(id)) => BookmarkTarget::Post(id),
                    (None, None) => return None,
                };
                Some(BookmarkEntry {
                    bookmark: Bookmark {
                        id: row.get("id"),
                        user_id: row.get("user_id"),
                        target,
                        created_at: row.get("created_at"),
                    },
                    title: row.get("title"),
                    slug: row.get("slug"),
                })
            })
            .collect())
    }
}
