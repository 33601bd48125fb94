//! Article repository
//!
//! Database operations for published articles, including the feed queries.
//! Listing queries join the author's profile so callers get
//! `ArticleWithAuthor` rows in a single round trip.

use super::{profile_summary_columns, profile_summary_from_row};
use crate::db::{sqlite, DynDatabasePool};
use crate::models::{Article, ArticleWithAuthor, ListParams, NewArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a published article
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Published article by slug, with its author
    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<ArticleWithAuthor>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Increment the view counter, returning the new value
    async fn increment_view_count(&self, id: i64) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Published articles newest first, optionally restricted to a category
    async fn list_published(
        &self,
        category: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<ArticleWithAuthor>, i64)>;

    /// Published articles by any of `author_ids`, newest first
    async fn list_by_authors(
        &self,
        author_ids: &[i64],
        params: &ListParams,
    ) -> Result<(Vec<ArticleWithAuthor>, i64)>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        create_article_sqlite(sqlite(&self.pool)?, article).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles a WHERE a.id = ?", ARTICLE_COLUMNS))
            .bind(id)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get article by ID")?;
        Ok(row.as_ref().map(row_to_article_sqlite))
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<ArticleWithAuthor>> {
        let sql = format!(
            "{} WHERE a.slug = ? AND a.is_published = 1",
            select_with_author()
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get article by slug")?;
        Ok(row.as_ref().map(row_to_article_with_author_sqlite))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE slug = ?")
            .bind(slug)
            .fetch_one(sqlite(&self.pool)?)
            .await
            .context("Failed to check slug")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn increment_view_count(&self, id: i64) -> Result<i64> {
        let row = sqlx::query(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
        )
        .bind(id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to increment view count")?;
        Ok(row.get("view_count"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(sqlite(&self.pool)?)
            .await
            .context("Failed to delete article")?;
        Ok(())
    }

    async fn list_published(
        &self,
        category: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<ArticleWithAuthor>, i64)> {
        list_published_sqlite(sqlite(&self.pool)?, category, params).await
    }

    async fn list_by_authors(
        &self,
        author_ids: &[i64],
        params: &ListParams,
    ) -> Result<(Vec<ArticleWithAuthor>, i64)> {
        if author_ids.is_empty() {
            return Ok((Vec::new(), 0));
        }
        list_by_authors_sqlite(sqlite(&self.pool)?, author_ids, params).await
    }
}

const ARTICLE_COLUMNS: &str = "a.id, a.user_id, a.title, a.content, a.excerpt, a.slug, a.category, a.image_url, a.published_at, a.is_published, a.view_count, a.created_at, a.updated_at";

fn select_with_author() -> String {
    format!(
        "SELECT {}, {} FROM articles a LEFT JOIN profiles p ON p.id = a.user_id",
        ARTICLE_COLUMNS,
        profile_summary_columns("p", "author")
    )
}

async fn create_article_sqlite(pool: &SqlitePool, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO articles (user_id, title, content, excerpt, slug, category, image_url,
                              published_at, is_published, view_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, 0, ?, ?)
        "#,
    )
    .bind(article.user_id)
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.excerpt)
    .bind(&article.slug)
    .bind(&article.category)
    .bind(&article.image_url)
    .bind(article.published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        user_id: article.user_id,
        title: article.title.clone(),
        content: article.content.clone(),
        excerpt: Some(article.excerpt.clone()),
        slug: article.slug.clone(),
        category: Some(article.category.clone()),
        image_url: article.image_url.clone(),
        published_at: article.published_at,
        is_published: true,
        view_count: 0,
        created_at: now,
        updated_at: now,
    })
}

async fn list_published_sqlite(
    pool: &SqlitePool,
    category: Option<&str>,
    params: &ListParams,
) -> Result<(Vec<ArticleWithAuthor>, i64)> {
    let filter = "a.is_published = 1 AND (? IS NULL OR a.category = ?)";

    let total: i64 = sqlx::query(&format!(
        "SELECT COUNT(*) as count FROM articles a WHERE {}",
        filter
    ))
    .bind(category)
    .bind(category)
    .fetch_one(pool)
    .await
    .context("Failed to count articles")?
    .get("count");

    let rows = sqlx::query(&format!(
        "{} WHERE {} ORDER BY a.published_at DESC, a.id DESC LIMIT ? OFFSET ?",
        select_with_author(),
        filter
    ))
    .bind(category)
    .bind(category)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list articles")?;

    Ok((
        rows.iter().map(row_to_article_with_author_sqlite).collect(),
        total,
    ))
}

async fn list_by_authors_sqlite(
    pool: &SqlitePool,
    author_ids: &[i64],
    params: &ListParams,
) -> Result<(Vec<ArticleWithAuthor>, i64)> {
    let placeholders = vec!["?"; author_ids.len()].join(", ");
    let filter = format!("a.is_published = 1 AND a.user_id IN ({})", placeholders);

    let count_sql = format!("SELECT COUNT(*) as count FROM articles a WHERE {}", filter);
    let mut count_query = sqlx::query(&count_sql);
    for id in author_ids {
        count_query = count_query.bind(*id);
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count followed articles")?
        .get("count");

    let list_sql = format!(
        "{} WHERE {} ORDER BY a.published_at DESC, a.id DESC LIMIT ? OFFSET ?",
        select_with_author(),
        filter
    );
    let mut list_query = sqlx::query(&list_sql);
    for id in author_ids {
        list_query = list_query.bind(*id);
    }
    let rows = list_query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list followed articles")?;

    Ok((
        rows.iter().map(row_to_article_with_author_sqlite).collect(),
        total,
    ))
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        slug: row.get("slug"),
        category: row.get("category"),
        image_url: row.get("image_url"),
        published_at: row.get("published_at"),
        is_published: row.get::<i64, _>("is_published") != 0,
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_article_with_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> ArticleWithAuthor {
    ArticleWithAuthor {
        article: row_to_article_sqlite(row),
        author: profile_summary_from_row(row, "author"),
    }
}
