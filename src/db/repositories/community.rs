//! Community repository
//!
//! Communities, their memberships and their posts. Post comments live in
//! the comment repository under `CommentScope::CommunityPost`.

use super::{profile_summary_columns, profile_summary_from_row};
use crate::db::{sqlite, DynDatabasePool};
use crate::models::{
    Community, CommunityMember, CommunityPost, CommunityPostWithMeta, CommunityWithStats,
    CreateCommunityInput, ListParams,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// Create a community and enrol the creator as admin
    async fn create(&self, creator_id: i64, input: &CreateCommunityInput) -> Result<Community>;

    async fn get_by_id(&self, id: i64) -> Result<Option<CommunityWithStats>>;

    async fn name_exists(&self, name: &str) -> Result<bool>;

    /// Communities ordered by name, optionally filtered by category
    async fn list(
        &self,
        category: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<CommunityWithStats>, i64)>;

    async fn is_member(&self, community_id: i64, user_id: i64) -> Result<bool>;

    /// Add a member; false when already a member
    async fn add_member(&self, community_id: i64, user_id: i64) -> Result<bool>;

    /// Remove a member; false when not a member
    async fn remove_member(&self, community_id: i64, user_id: i64) -> Result<bool>;

    /// Members in join order
    async fn members(&self, community_id: i64) -> Result<Vec<CommunityMember>>;

    async fn create_post(
        &self,
        community_id: i64,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<CommunityPost>;

    async fn get_post(&self, post_id: i64) -> Result<Option<CommunityPost>>;

    /// Posts newest first, with author and comment count
    async fn list_posts(
        &self,
        community_id: i64,
        params: &ListParams,
    ) -> Result<(Vec<CommunityPostWithMeta>, i64)>;
}

pub struct SqlxCommunityRepository {
    pool: DynDatabasePool,
}

impl SqlxCommunityRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommunityRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COMMUNITY_WITH_STATS: &str = r#"
    SELECT c.id, c.name, c.description, c.creator_id, c.image_url, c.banner_url, c.category,
           c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id) AS member_count
    FROM communities c
"#;

#[async_trait]
impl CommunityRepository for SqlxCommunityRepository {
    async fn create(&self, creator_id: i64, input: &CreateCommunityInput) -> Result<Community> {
        create_community_sqlite(sqlite(&self.pool)?, creator_id, input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CommunityWithStats>> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", SELECT_COMMUNITY_WITH_STATS))
            .bind(id)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get community")?;
        Ok(row.as_ref().map(row_to_community_with_stats_sqlite))
    }

    async fn name_exists(&self, name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM communities WHERE name = ?")
            .bind(name)
            .fetch_one(sqlite(&self.pool)?)
            .await
            .context("Failed to check community name")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn list(
        &self,
        category: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<CommunityWithStats>, i64)> {
        let pool = sqlite(&self.pool)?;
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) as count FROM communities WHERE (? IS NULL OR category = ?)",
        )
        .bind(category)
        .bind(category)
        .fetch_one(pool)
        .await
        .context("Failed to count communities")?
        .get("count");

        let rows = sqlx::query(&format!(
            "{} WHERE (? IS NULL OR c.category = ?) ORDER BY c.name ASC LIMIT ? OFFSET ?",
            SELECT_COMMUNITY_WITH_STATS
        ))
        .bind(category)
        .bind(category)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list communities")?;

        Ok((
            rows.iter().map(row_to_community_with_stats_sqlite).collect(),
            total,
        ))
    }

    async fn is_member(&self, community_id: i64, user_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM community_members WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to check membership")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn add_member(&self, community_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO community_members (community_id, user_id, is_admin, joined_at) VALUES (?, ?, 0, ?)",
        )
        .bind(community_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to add member")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, community_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM community_members WHERE community_id = ? AND user_id = ?")
                .bind(community_id)
                .bind(user_id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to remove member")?;
        Ok(result.rows_affected() > 0)
    }

    async fn members(&self, community_id: i64) -> Result<Vec<CommunityMember>> {
        let sql = format!(
            r#"
            SELECT m.id, m.community_id, m.user_id, m.is_admin, m.joined_at, {}
            FROM community_members m
            LEFT JOIN profiles p ON p.id = m.user_id
            WHERE m.community_id = ?
            ORDER BY m.joined_at ASC, m.id ASC
            "#,
            profile_summary_columns("p", "member")
        );
        let rows = sqlx::query(&sql)
            .bind(community_id)
            .fetch_all(sqlite(&self.pool)?)
            .await
            .context("Failed to list members")?;

        Ok(rows
            .iter()
            .map(|row| CommunityMember {
                id: row.get("id"),
                community_id: row.get("community_id"),
                user_id: row.get("user_id"),
                is_admin: row.get::<i64, _>("is_admin") != 0,
                joined_at: row.get("joined_at"),
                profile: profile_summary_from_row(row, "member"),
            })
            .collect())
    }

    async fn create_post(
        &self,
        community_id: i64,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<CommunityPost> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO community_posts (community_id, user_id, title, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(community_id)
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to create post")?;

        Ok(CommunityPost {
            id: result.last_insert_rowid(),
            community_id,
            user_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: None,
        })
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<CommunityPost>> {
        let row = sqlx::query(
            "SELECT id, community_id, user_id, title, content, created_at, updated_at FROM community_posts WHERE id = ?",
        )
        .bind(post_id)
        .fetch_optional(sqlite(&self.pool)?)
        .await
        .context("Failed to get post")?;
        Ok(row.as_ref().map(row_to_post_sqlite))
    }

    async fn list_posts(
        &self,
        community_id: i64,
        params: &ListParams,
    ) -> Result<(Vec<CommunityPostWithMeta>, i64)> {
        list_posts_sqlite(sqlite(&self.pool)?, community_id, params).await
    }
}

async fn create_community_sqlite(
    pool: &SqlitePool,
    creator_id: i64,
    input: &CreateCommunityInput,
) -> Result<Community> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO communities (name, description, creator_id, image_url, banner_url, category, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(creator_id)
    .bind(&input.image_url)
    .bind(&input.banner_url)
    .bind(&input.category)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create community")?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO community_members (community_id, user_id, is_admin, joined_at) VALUES (?, ?, 1, ?)",
    )
    .bind(id)
    .bind(creator_id)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to enrol community creator")?;

    tx.commit().await.context("Failed to commit community")?;

    Ok(Community {
        id,
        name: input.name.clone(),
        description: input.description.clone(),
        creator_id,
        image_url: input.image_url.clone(),
        banner_url: input.banner_url.clone(),
        category: input.category.clone(),
        created_at: now,
        updated_at: None,
    })
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    community_id: i64,
    params: &ListParams,
) -> Result<(Vec<CommunityPostWithMeta>, i64)> {
    let total: i64 =
        sqlx::query("SELECT COUNT(*) as count FROM community_posts WHERE community_id = ?")
            .bind(community_id)
            .fetch_one(pool)
            .await
            .context("Failed to count posts")?
            .get("count");

    let sql = format!(
        r#"
        SELECT cp.id, cp.community_id, cp.user_id, cp.title, cp.content, cp.created_at, cp.updated_at,
               (SELECT COUNT(*) FROM community_post_comments pc WHERE pc.post_id = cp.id) AS comment_count,
               {}
        FROM community_posts cp
        LEFT JOIN profiles p ON p.id = cp.user_id
        WHERE cp.community_id = ?
        ORDER BY cp.created_at DESC, cp.id DESC
        LIMIT ? OFFSET ?
        "#,
        profile_summary_columns("p", "author")
    );
    let rows = sqlx::query(&sql)
        .bind(community_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok((
        rows.iter()
            .map(|row| CommunityPostWithMeta {
                post: row_to_post_sqlite(row),
                author: profile_summary_from_row(row, "author"),
                comment_count: row.get("comment_count"),
            })
            .collect(),
        total,
    ))
}

fn row_to_community_with_stats_sqlite(row: &sqlx::sqlite::SqliteRow) -> CommunityWithStats {
    CommunityWithStats {
        community: Community {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            creator_id: row.get("creator_id"),
            image_url: row.get("image_url"),
            banner_url: row.get("banner_url"),
            category: row.get("category"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        member_count: row.get("member_count"),
    }
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> CommunityPost {
    CommunityPost {
        id: row.get("id"),
        community_id: row.get("community_id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
