//! Profile repository
//!
//! Profiles share their id with the owning user. Besides plain CRUD this
//! repository answers the counters shown on profile pages and batch summary
//! lookups used when decorating lists.

use crate::db::{sqlite, DynDatabasePool};
use crate::models::{Profile, ProfileStats, ProfileSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert the profile row for a new user
    async fn create(&self, profile: &Profile) -> Result<Profile>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Whether `username` is held by a profile other than `exclude_id`
    async fn username_taken(&self, username: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Overwrite all editable fields
    async fn update(&self, profile: &Profile) -> Result<Profile>;

    async fn get_summary(&self, id: i64) -> Result<Option<ProfileSummary>>;

    /// Followers, following and published article counts
    async fn stats(&self, id: i64) -> Result<ProfileStats>;
}

pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn create(&self, profile: &Profile) -> Result<Profile> {
        create_profile_sqlite(sqlite(&self.pool)?, profile).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PROFILE))
            .bind(id)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get profile by ID")?;
        Ok(row.as_ref().map(row_to_profile_sqlite))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!("{} WHERE username = ?", SELECT_PROFILE))
            .bind(username)
            .fetch_optional(sqlite(&self.pool)?)
            .await
            .context("Failed to get profile by username")?;
        Ok(row.as_ref().map(row_to_profile_sqlite))
    }

    async fn username_taken(&self, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM profiles WHERE username = ? AND id <> ?",
        )
        .bind(username)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to check username")?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn update(&self, profile: &Profile) -> Result<Profile> {
        update_profile_sqlite(sqlite(&self.pool)?, profile).await
    }

    async fn get_summary(&self, id: i64) -> Result<Option<ProfileSummary>> {
        Ok(self.get_by_id(id).await?.map(|p| p.summary()))
    }

    async fn stats(&self, id: i64) -> Result<ProfileStats> {
        profile_stats_sqlite(sqlite(&self.pool)?, id).await
    }
}

const SELECT_PROFILE: &str = r#"
    SELECT id, username, full_name, avatar_url, bio, website, twitter, github, linkedin, created_at, updated_at
    FROM profiles
"#;

async fn create_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO profiles (id, username, full_name, avatar_url, bio, website, twitter, github, linkedin, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.id)
    .bind(&profile.username)
    .bind(&profile.full_name)
    .bind(&profile.avatar_url)
    .bind(&profile.bio)
    .bind(&profile.website)
    .bind(&profile.twitter)
    .bind(&profile.github)
    .bind(&profile.linkedin)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create profile")?;

    Ok(Profile {
        created_at: now,
        updated_at: now,
        ..profile.clone()
    })
}

async fn update_profile_sqlite(pool: &SqlitePool, profile: &Profile) -> Result<Profile> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE profiles
        SET username = ?, full_name = ?, avatar_url = ?, bio = ?, website = ?,
            twitter = ?, github = ?, linkedin = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&profile.username)
    .bind(&profile.full_name)
    .bind(&profile.avatar_url)
    .bind(&profile.bio)
    .bind(&profile.website)
    .bind(&profile.twitter)
    .bind(&profile.github)
    .bind(&profile.linkedin)
    .bind(now)
    .bind(profile.id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    Ok(Profile {
        updated_at: now,
        ..profile.clone()
    })
}

async fn profile_stats_sqlite(pool: &SqlitePool, id: i64) -> Result<ProfileStats> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM follows WHERE following_id = ?) AS followers,
            (SELECT COUNT(*) FROM follows WHERE follower_id = ?) AS following,
            (SELECT COUNT(*) FROM articles WHERE user_id = ? AND is_published = 1) AS articles
        "#,
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .fetch_one(pool)
    .await
    .context("Failed to count profile stats")?;

    Ok(ProfileStats {
        followers: row.get("followers"),
        following: row.get("following"),
        articles: row.get("articles"),
    })
}

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
        bio: row.get("bio"),
        website: row.get("website"),
        twitter: row.get("twitter"),
        github: row.get("github"),
        linkedin: row.get("linkedin"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
