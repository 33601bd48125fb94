//! Notification repository

use super::{profile_summary_columns, profile_summary_from_row};
use crate::db::{sqlite, DynDatabasePool};
use crate::models::{
    ListParams, NewNotification, Notification, NotificationType, NotificationWithActor,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// Notifications for `user_id`, newest first, with actor and article slug
    async fn list_for_user(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<Vec<NotificationWithActor>>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;

    /// Mark one notification read if it belongs to `user_id`; false otherwise
    async fn mark_read(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn mark_all_read(&self, user_id: i64) -> Result<u64>;
}

pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, action_type, action_user_id, article_id, comment_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.action_type.as_str())
        .bind(notification.action_user_id)
        .bind(notification.article_id)
        .bind(notification.comment_id)
        .bind(now)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to create notification")?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id: notification.user_id,
            action_type: notification.action_type,
            action_user_id: notification.action_user_id,
            article_id: notification.article_id,
            comment_id: notification.comment_id,
            is_read: false,
            created_at: now,
        })
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<Vec<NotificationWithActor>> {
        let sql = format!(
            r#"
            SELECT n.id, n.user_id, n.action_type, n.action_user_id, n.article_id, n.comment_id,
                   n.is_read, n.created_at, a.slug AS article_slug, {}
            FROM notifications n
            LEFT JOIN profiles p ON p.id = n.action_user_id
            LEFT JOIN articles a ON a.id = n.article_id
            WHERE n.user_id = ?
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ? OFFSET ?
            "#,
            profile_summary_columns("p", "actor")
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(sqlite(&self.pool)?)
            .await
            .context("Failed to list notifications")?;

        rows.iter()
            .map(|row| {
                Ok(NotificationWithActor {
                    notification: row_to_notification_sqlite(row)?,
                    actor: profile_summary_from_row(row, "actor"),
                    article_slug: row.get("article_slug"),
                })
            })
            .collect()
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to count unread notifications")?;
        Ok(row.get("count"))
    }

    async fn mark_read(&self, user_id: i64, id: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to mark notification read")?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to mark notifications read")?;
        Ok(result.rows_affected())
    }
}

fn row_to_notification_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let action: String = row.get("action_type");
    let action_type = NotificationType::from_str(&action)
        .ok_or_else(|| anyhow!("Invalid notification type in database: {}", action))?;

    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        action_type,
        action_user_id: row.get("action_user_id"),
        article_id: row.get("article_id"),
        comment_id: row.get("comment_id"),
        is_read: row.get::<i64, _>("is_read") != 0,
        created_at: row.get("created_at"),
    })
}
