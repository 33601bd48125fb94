//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity (or a tight group of
//! entities, such as a community with its members and posts).

pub mod article;
pub mod bookmark;
pub mod comment;
pub mod community;
pub mod draft;
pub mod follow;
pub mod like;
pub mod message;
pub mod notification;
pub mod profile;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use bookmark::{BookmarkRepository, SqlxBookmarkRepository};
pub use comment::{CommentRepository, CommentScope, SqlxCommentRepository};
pub use community::{CommunityRepository, SqlxCommunityRepository};
pub use draft::{DraftRepository, SqlxDraftRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use like::{LikeRepository, SqlxLikeRepository};
pub use message::{ConversationRow, MessageRepository, SqlxMessageRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use crate::models::ProfileSummary;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Columns selecting a profile summary from a `profiles` join aliased `alias`,
/// exposed under `{prefix}_id`, `{prefix}_username`, ...
pub(crate) fn profile_summary_columns(alias: &str, prefix: &str) -> String {
    format!(
        "{a}.id AS {p}_id, {a}.username AS {p}_username, {a}.full_name AS {p}_full_name, {a}.avatar_url AS {p}_avatar_url",
        a = alias,
        p = prefix
    )
}

/// Read a profile summary selected with [`profile_summary_columns`].
/// Returns `None` when the join found no profile.
pub(crate) fn profile_summary_from_row(row: &SqliteRow, prefix: &str) -> Option<ProfileSummary> {
    let id: Option<i64> = row.try_get(format!("{}_id", prefix).as_str()).ok().flatten();
    id.map(|id| ProfileSummary {
        id,
        username: row
            .try_get(format!("{}_username", prefix).as_str())
            .ok()
            .flatten(),
        full_name: row
            .try_get(format!("{}_full_name", prefix).as_str())
            .ok()
            .flatten(),
        avatar_url: row
            .try_get(format!("{}_avatar_url", prefix).as_str())
            .ok()
            .flatten(),
    })
}

/// Shared fixtures for repository and service tests
#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{create_test_pool, migrations, sqlite, DynDatabasePool};
    use chrono::{Duration, Utc};

    pub async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    /// Insert a user with an empty profile named `username`
    pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> i64 {
        let sqlite_pool = sqlite(pool).expect("sqlite pool");
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at, updated_at) VALUES (?, 'hash', ?, ?)",
        )
        .bind(format!("{}@example.com", username))
        .bind(now)
        .bind(now)
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert user")
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO profiles (id, username, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(username)
        .bind(now)
        .bind(now)
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert profile");

        id
    }

    /// Insert a published article; `age_minutes` pushes `published_at` into the past
    pub async fn insert_article(
        pool: &DynDatabasePool,
        user_id: i64,
        slug: &str,
        category: &str,
        age_minutes: i64,
    ) -> i64 {
        let sqlite_pool = sqlite(pool).expect("sqlite pool");
        let published = Utc::now() - Duration::minutes(age_minutes);
        sqlx::query(
            r#"
            INSERT INTO articles (user_id, title, content, excerpt, slug, category, published_at, is_published, view_count, created_at, updated_at)
            VALUES (?, ?, 'content', 'excerpt', ?, ?, ?, 1, 0, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(format!("Title {}", slug))
        .bind(slug)
        .bind(category)
        .bind(published)
        .bind(published)
        .bind(published)
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert article")
        .last_insert_rowid()
    }

    pub async fn insert_follow(pool: &DynDatabasePool, follower: i64, following: i64) {
        sqlx::query("INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)")
            .bind(follower)
            .bind(following)
            .bind(Utc::now())
            .execute(sqlite(pool).expect("sqlite pool"))
            .await
            .expect("Failed to insert follow");
    }
}
