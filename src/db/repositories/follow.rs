//! Follow repository

use super::{profile_summary_columns, profile_summary_from_row};
use crate::db::{sqlite, DynDatabasePool};
use crate::models::ProfileSummary;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert the follow edge; false when it already existed
    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Remove the follow edge; false when there was none
    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool>;

    /// Ids of the users `follower_id` follows
    async fn following_ids(&self, follower_id: i64) -> Result<Vec<i64>>;

    /// Profiles following `user_id`, most recent first
    async fn followers(&self, user_id: i64) -> Result<Vec<ProfileSummary>>;

    /// Profiles `user_id` follows, most recent first
    async fn following(&self, user_id: i64) -> Result<Vec<ProfileSummary>>;
}

pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(Utc::now())
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to create follow")?;
        Ok(result.rows_affected() > 0)
    }

    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to delete follow")?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to check follow")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn following_ids(&self, follower_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT following_id FROM follows WHERE follower_id = ?")
            .bind(follower_id)
            .fetch_all(sqlite(&self.pool)?)
            .await
            .context("Failed to list followed ids")?;
        Ok(rows.iter().map(|row| row.get("following_id")).collect())
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<ProfileSummary>> {
        list_edge_profiles_sqlite(sqlite(&self.pool)?, "following_id", "follower_id", user_id).await
    }

    async fn following(&self, user_id: i64) -> Result<Vec<ProfileSummary>> {
        list_edge_profiles_sqlite(sqlite(&self.pool)?, "follower_id", "following_id", user_id).await
    }
}

/// Profiles on the `other` end of follow edges whose `anchor` column is `user_id`
async fn list_edge_profiles_sqlite(
    pool: &SqlitePool,
    anchor: &str,
    other: &str,
    user_id: i64,
) -> Result<Vec<ProfileSummary>> {
    let sql = format!(
        r#"
        SELECT {}
        FROM follows f
        INNER JOIN profiles p ON p.id = f.{}
        WHERE f.{} = ?
        ORDER BY f.created_at DESC, f.id DESC
        "#,
        profile_summary_columns("p", "profile"),
        other,
        anchor
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list follow profiles")?;

    Ok(rows
        .iter()
        .filter_map(|row| profile_summary_from_row(row, "profile"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let pool = migrated_pool().await;
        let repo = SqlxFollowRepository::new(pool.clone());
        let a = insert_user(&pool, "a").await;
        let b = insert_user(&pool, "b").await;

        assert!(repo.follow(a, b).await.unwrap());
        assert!(!repo.follow(a, b).await.unwrap());
        assert!(repo.is_following(a, b).await.unwrap());
        assert!(!repo.is_following(b, a).await.unwrap());
        assert_eq!(repo.following_ids(a).await.unwrap(), vec![b]);

        assert!(repo.unfollow(a, b).await.unwrap());
        assert!(!repo.unfollow(a, b).await.unwrap());
        assert!(repo.following_ids(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_followers_and_following_profiles() {
        let pool = migrated_pool().await;
        let repo = SqlxFollowRepository::new(pool.clone());
        let star = insert_user(&pool, "star").await;
        let fan1 = insert_user(&pool, "fan1").await;
        let fan2 = insert_user(&pool, "fan2").await;

        repo.follow(fan1, star).await.unwrap();
        repo.follow(fan2, star).await.unwrap();

        let followers = repo.followers(star).await.unwrap();
        let names: Vec<Option<String>> = followers.into_iter().map(|p| p.username).collect();
        assert_eq!(
            names,
            vec![Some("fan2".to_string()), Some("fan1".to_string())]
        );

        let following = repo.following(fan1).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].id, star);
    }
}
