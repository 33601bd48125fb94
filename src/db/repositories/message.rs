//! Direct message repository

use crate::db::{sqlite, DynDatabasePool};
use crate::models::{ListParams, Message};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Latest message with one partner plus the unread count from them
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub partner_id: i64,
    pub last_message: Message,
    pub unread_count: i64,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, sender_id: i64, recipient_id: i64, content: &str) -> Result<Message>;

    /// Messages exchanged between two users, newest first
    async fn conversation(
        &self,
        user_id: i64,
        other_id: i64,
        params: &ListParams,
    ) -> Result<Vec<Message>>;

    /// One row per partner, most recent conversation first
    async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationRow>>;

    /// Mark messages from `other_id` to `user_id` as read
    async fn mark_conversation_read(&self, user_id: i64, other_id: i64) -> Result<u64>;

    async fn mark_all_read(&self, user_id: i64) -> Result<u64>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;
}

pub struct SqlxMessageRepository {
    pool: DynDatabasePool,
}

impl SqlxMessageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MessageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MessageRepository for SqlxMessageRepository {
    async fn create(&self, sender_id: i64, recipient_id: i64, content: &str) -> Result<Message> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO messages (sender_id, recipient_id, content, is_read, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(content)
        .bind(now)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to create message")?;

        Ok(Message {
            id: result.last_insert_rowid(),
            sender_id,
            recipient_id,
            content: content.to_string(),
            is_read: false,
            created_at: now,
        })
    }

    async fn conversation(
        &self,
        user_id: i64,
        other_id: i64,
        params: &ListParams,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, recipient_id, content, is_read, created_at
            FROM messages
            WHERE (sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(other_id)
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(sqlite(&self.pool)?)
        .await
        .context("Failed to load conversation")?;

        Ok(rows.iter().map(row_to_message_sqlite).collect())
    }

    async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationRow>> {
        conversations_sqlite(sqlite(&self.pool)?, user_id).await
    }

    async fn mark_conversation_read(&self, user_id: i64, other_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE recipient_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .bind(other_id)
        .execute(sqlite(&self.pool)?)
        .await
        .context("Failed to mark conversation read")?;
        Ok(result.rows_affected())
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE messages SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to mark messages read")?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM messages WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(sqlite(&self.pool)?)
        .await
        .context("Failed to count unread messages")?;
        Ok(row.get("count"))
    }
}

async fn conversations_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<ConversationRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, sender_id, recipient_id, content, is_read, created_at
        FROM messages
        WHERE sender_id = ? OR recipient_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list conversations")?;

    let mut order = Vec::new();
    let mut by_partner: HashMap<i64, ConversationRow> = HashMap::new();

    for message in rows.iter().map(row_to_message_sqlite) {
        let partner_id = if message.sender_id == user_id {
            message.recipient_id
        } else {
            message.sender_id
        };
        let unread = i64::from(message.recipient_id == user_id && !message.is_read);

        match by_partner.get_mut(&partner_id) {
            Some(row) => row.unread_count += unread,
            None => {
                order.push(partner_id);
                by_partner.insert(
                    partner_id,
                    ConversationRow {
                        partner_id,
                        last_message: message,
                        unread_count: unread,
                    },
                );
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|partner| by_partner.remove(&partner))
        .collect())
}

fn row_to_message_sqlite(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        recipient_id: row.get("recipient_id"),
        content: row.get("content"),
        is_read: row.get::<i64, _>("is_read") != 0,
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_conversations_group_by_partner() {
        let pool = migrated_pool().await;
        let repo = SqlxMessageRepository::new(pool.clone());
        let me = insert_user(&pool, "me").await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;

        repo.create(alice, me, "hi from alice").await.unwrap();
        repo.create(me, alice, "hi alice").await.unwrap();
        repo.create(bob, me, "one").await.unwrap();
        repo.create(bob, me, "two").await.unwrap();

        let conversations = repo.conversations(me).await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].partner_id, bob);
        assert_eq!(conversations[0].last_message.content, "two");
        assert_eq!(conversations[0].unread_count, 2);
        assert_eq!(conversations[1].partner_id, alice);
        assert_eq!(conversations[1].unread_count, 1);
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_count() {
        let pool = migrated_pool().await;
        let repo = SqlxMessageRepository::new(pool.clone());
        let me = insert_user(&pool, "me").await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;

        repo.create(alice, me, "a").await.unwrap();
        repo.create(bob, me, "b").await.unwrap();
        repo.create(me, bob, "reply").await.unwrap();
        assert_eq!(repo.unread_count(me).await.unwrap(), 2);

        assert_eq!(repo.mark_conversation_read(me, alice).await.unwrap(), 1);
        assert_eq!(repo.unread_count(me).await.unwrap(), 1);

        assert_eq!(repo.mark_all_read(me).await.unwrap(), 1);
        assert_eq!(repo.unread_count(me).await.unwrap(), 0);
        assert_eq!(repo.unread_count(bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversation_is_newest_first() {
        let pool = migrated_pool().await;
        let repo = SqlxMessageRepository::new(pool.clone());
        let me = insert_user(&pool, "me").await;
        let alice = insert_user(&pool, "alice").await;

        repo.create(me, alice, "first").await.unwrap();
        repo.create(alice, me, "second").await.unwrap();

        let messages = repo
            .conversation(me, alice, &ListParams::new(1, 50))
            .await
            .unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "first"]);
    }
}
