//! Draft repository

use crate::db::{sqlite, DynDatabasePool};
use crate::models::{Draft, DraftInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn create(&self, user_id: i64, input: &DraftInput) -> Result<Draft>;

    /// Draft `id` if it belongs to `user_id`
    async fn get_owned(&self, user_id: i64, id: i64) -> Result<Option<Draft>>;

    /// All drafts of a user, most recently updated first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Draft>>;

    async fn update(&self, user_id: i64, id: i64, input: &DraftInput) -> Result<Option<Draft>>;

    /// Delete an owned draft; false when nothing matched
    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn mark_published(&self, id: i64, article_id: i64) -> Result<()>;
}

pub struct SqlxDraftRepository {
    pool: DynDatabasePool,
}

impl SqlxDraftRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn DraftRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_DRAFT: &str = r#"
    SELECT id, user_id, title, content, excerpt, category, slug, image_url,
           is_published, published_id, created_at, updated_at
    FROM drafts
"#;

#[async_trait]
impl DraftRepository for SqlxDraftRepository {
    async fn create(&self, user_id: i64, input: &DraftInput) -> Result<Draft> {
        create_draft_sqlite(sqlite(&self.pool)?, user_id, input).await
    }

    async fn get_owned(&self, user_id: i64, id: i64) -> Result<Option<Draft>> {
        let row = sqlx::query(&format!("{} WHERE id = ? AND user_id = ?", SELECT_DRAFT))
            .bind(id)
            .bind(user_id)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get draft")?;
        Ok(row.as_ref().map(row_to_draft_sqlite))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Draft>> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? ORDER BY updated_at DESC, id DESC",
            SELECT_DRAFT
        ))
        .bind(user_id)
        .fetch_all(sqlite(&self.pool)?)
        .await
        .context("Failed to list drafts")?;
        Ok(rows.iter().map(row_to_draft_sqlite).collect())
    }

    async fn update(&self, user_id: i64, id: i64, input: &DraftInput) -> Result<Option<Draft>> {
        let result = sqlx::query(
            r#"
            UPDATE drafts
            SET title = ?, content = ?, excerpt = ?, category = ?, image_url = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to update draft")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_owned(user_id, id).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to delete draft")?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_published(&self, id: i64, article_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE drafts SET is_published = 1, published_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(article_id)
        .bind(Utc::now())
        .bind(id)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to mark draft published")?;
        Ok(())
    }
}

async fn create_draft_sqlite(pool: &SqlitePool, user_id: i64, input: &DraftInput) -> Result<Draft> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO drafts (user_id, title, content, excerpt, category, image_url, is_published, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&input.title)
    .bind(&input.content)
    .bind(&input.excerpt)
    .bind(&input.category)
    .bind(&input.image_url)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create draft")?;

    Ok(Draft {
        id: result.last_insert_rowid(),
        user_id,
        title: input.title.clone(),
        content: input.content.clone(),
        excerpt: input.excerpt.clone(),
        category: input.category.clone(),
        slug: None,
        image_url: input.image_url.clone(),
        is_published: false,
        published_id: None,
        created_at: now,
        updated_at: now,
    })
}

fn row_to_draft_sqlite(row: &sqlx::sqlite::SqliteRow) -> Draft {
    Draft {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        category: row.get("category"),
        slug: row.get("slug"),
        image_url: row.get("image_url"),
        is_published: row.get::<i64, _>("is_published") != 0,
        published_id: row.get("published_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, migrated_pool};

    fn input(title: &str) -> DraftInput {
        DraftInput {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_drafts_are_owner_scoped() {
        let pool = migrated_pool().await;
        let repo = SqlxDraftRepository::new(pool.clone());
        let owner = insert_user(&pool, "owner").await;
        let other = insert_user(&pool, "other").await;

        let draft = repo.create(owner, &input("Notes")).await.unwrap();

        assert!(repo.get_owned(owner, draft.id).await.unwrap().is_some());
        assert!(repo.get_owned(other, draft.id).await.unwrap().is_none());
        assert!(repo.update(other, draft.id, &input("Hijack")).await.unwrap().is_none());
        assert!(!repo.delete(other, draft.id).await.unwrap());
        assert!(repo.delete(owner, draft.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_by_last_update() {
        let pool = migrated_pool().await;
        let repo = SqlxDraftRepository::new(pool.clone());
        let owner = insert_user(&pool, "owner").await;

        let first = repo.create(owner, &input("First")).await.unwrap();
        repo.create(owner, &input("Second")).await.unwrap();
        repo.update(owner, first.id, &input("First, revised"))
            .await
            .unwrap();

        let drafts = repo.list_by_user(owner).await.unwrap();
        assert_eq!(drafts[0].id, first.id);
        assert_eq!(drafts[0].title.as_deref(), Some("First, revised"));
    }

    #[tokio::test]
    async fn test_mark_published() {
        let pool = migrated_pool().await;
        let repo = SqlxDraftRepository::new(pool.clone());
        let owner = insert_user(&pool, "owner").await;
        let article = insert_article(&pool, owner, "rome", "general", 0).await;

        let draft = repo.create(owner, &input("Rome")).await.unwrap();
        repo.mark_published(draft.id, article).await.unwrap();

        let draft = repo.get_owned(owner, draft.id).await.unwrap().unwrap();
        assert!(draft.is_published);
        assert_eq!(draft.published_id, Some(article));
    }
}
