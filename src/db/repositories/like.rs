//! Like repository
//!
//! One row per (user, article). The unique constraint keeps likes idempotent.

use crate::db::{sqlite, DynDatabasePool};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait LikeRepository: Send + Sync {
    async fn is_liked(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Insert a like; false when it already existed
    async fn like(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Remove a like; false when there was none
    async fn unlike(&self, user_id: i64, article_id: i64) -> Result<bool>;

    async fn count_for_article(&self, article_id: i64) -> Result<i64>;
}

pub struct SqlxLikeRepository {
    pool: DynDatabasePool,
}

impl SqlxLikeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LikeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LikeRepository for SqlxLikeRepository {
    async fn is_liked(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM likes WHERE user_id = ? AND article_id = ?",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to check like")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn like(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO likes (user_id, article_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(Utc::now())
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to create like")?;
        Ok(result.rows_affected() > 0)
    }

    async fn unlike(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND article_id = ?")
            .bind(user_id)
            .bind(article_id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to delete like")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_for_article(&self, article_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM likes WHERE article_id = ?")
            .bind(article_id)
            .fetch_one(sqlite(&self.pool)?)
            .await
            .context("Failed to count likes")?;
        Ok(row.get("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, migrated_pool};

    #[tokio::test]
    async fn test_like_is_idempotent() {
        let pool = migrated_pool().await;
        let repo = SqlxLikeRepository::new(pool.clone());
        let user = insert_user(&pool, "reader").await;
        let article = insert_article(&pool, user, "rome", "general", 0).await;

        assert!(repo.like(user, article).await.unwrap());
        assert!(!repo.like(user, article).await.unwrap());
        assert_eq!(repo.count_for_article(article).await.unwrap(), 1);
        assert!(repo.is_liked(user, article).await.unwrap());

        assert!(repo.unlike(user, article).await.unwrap());
        assert!(!repo.unlike(user, article).await.unwrap());
        assert_eq!(repo.count_for_article(article).await.unwrap(), 0);
    }
}
