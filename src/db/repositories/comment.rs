//! Comment repository
//!
//! Article comments and community post comments share one shape: a target
//! id, an optional parent and content. `CommentScope` picks the table.

use super::{profile_summary_columns, profile_summary_from_row};
use crate::db::{sqlite, DynDatabasePool};
use crate::models::{Comment, ProfileSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Which comment table a repository works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentScope {
    Article,
    CommunityPost,
}

impl CommentScope {
    fn table(&self) -> &'static str {
        match self {
            CommentScope::Article => "comments",
            CommentScope::CommunityPost => "community_post_comments",
        }
    }

    fn target_column(&self) -> &'static str {
        match self {
            CommentScope::Article => "article_id",
            CommentScope::CommunityPost => "post_id",
        }
    }
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        target_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on `target_id`, oldest first, with author summaries
    async fn list_for_target(&self, target_id: i64)
        -> Result<Vec<(Comment, Option<ProfileSummary>)>>;

    /// Delete a comment; replies go with it
    async fn delete(&self, id: i64) -> Result<()>;

    async fn count_for_target(&self, target_id: i64) -> Result<i64>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
    scope: CommentScope,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool, scope: CommentScope) -> Self {
        Self { pool, scope }
    }

    pub fn boxed(pool: DynDatabasePool, scope: CommentScope) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool, scope))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(
        &self,
        user_id: i64,
        target_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<Comment> {
        create_comment_sqlite(
            sqlite(&self.pool)?,
            self.scope,
            user_id,
            target_id,
            parent_id,
            content,
        )
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!(
            "SELECT id, user_id, {} AS target_id, parent_id, content, created_at, updated_at FROM {} WHERE id = ?",
            self.scope.target_column(),
            self.scope.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get comment")?;
        Ok(row.as_ref().map(row_to_comment_sqlite))
    }

    async fn list_for_target(
        &self,
        target_id: i64,
    ) -> Result<Vec<(Comment, Option<ProfileSummary>)>> {
        let sql = format!(
            r#"
            SELECT c.id, c.user_id, c.{col} AS target_id, c.parent_id, c.content, c.created_at, c.updated_at, {author}
            FROM {table} c
            LEFT JOIN profiles p ON p.id = c.user_id
            WHERE c.{col} = ?
            ORDER BY c.created_at ASC, c.id ASC
            "#,
            col = self.scope.target_column(),
            table = self.scope.table(),
            author = profile_summary_columns("p", "author"),
        );
        let rows = sqlx::query(&sql)
            .bind(target_id)
            .fetch_all(sqlite(&self.pool)?)
            .await
            .context("Failed to list comments")?;

        Ok(rows
            .iter()
            .map(|row| (row_to_comment_sqlite(row), profile_summary_from_row(row, "author")))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.scope.table()))
            .bind(id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    async fn count_for_target(&self, target_id: i64) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM {} WHERE {} = ?",
            self.scope.table(),
            self.scope.target_column()
        );
        let row = sqlx::query(&sql)
            .bind(target_id)
            .fetch_one(sqlite(&self.pool)?)
            .await
            .context("Failed to count comments")?;
        Ok(row.get("count"))
    }
}

async fn create_comment_sqlite(
    pool: &SqlitePool,
    scope: CommentScope,
    user_id: i64,
    target_id: i64,
    parent_id: Option<i64>,
    content: &str,
) -> Result<Comment> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO {} (user_id, {}, parent_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        scope.table(),
        scope.target_column()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(target_id)
        .bind(parent_id)
        .bind(content)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        user_id,
        target_id,
        parent_id,
        content: content.to_string(),
        created_at: now,
        updated_at: None,
    })
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        target_id: row.get("target_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, migrated_pool};

    #[tokio::test]
    async fn test_create_and_list_with_authors() {
        let pool = migrated_pool().await;
        let repo = SqlxCommentRepository::new(pool.clone(), CommentScope::Article);
        let user = insert_user(&pool, "reader").await;
        let article = insert_article(&pool, user, "rome", "general", 0).await;

        let root = repo.create(user, article, None, "First").await.unwrap();
        repo.create(user, article, Some(root.id), "Reply").await.unwrap();

        let listed = repo.list_for_target(article).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0.content, "First");
        assert_eq!(listed[1].0.parent_id, Some(root.id));
        assert_eq!(
            listed[0].1.as_ref().and_then(|a| a.username.clone()),
            Some("reader".to_string())
        );
        assert_eq!(repo.count_for_target(article).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_replies() {
        let pool = migrated_pool().await;
        let repo = SqlxCommentRepository::new(pool.clone(), CommentScope::Article);
        let user = insert_user(&pool, "reader").await;
        let article = insert_article(&pool, user, "rome", "general", 0).await;

        let root = repo.create(user, article, None, "Root").await.unwrap();
        let reply = repo.create(user, article, Some(root.id), "Reply").await.unwrap();

        repo.delete(root.id).await.unwrap();

        assert!(repo.get_by_id(reply.id).await.unwrap().is_none());
        assert_eq!(repo.count_for_target(article).await.unwrap(), 0);
    }
}
