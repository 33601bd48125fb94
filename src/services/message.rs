//! Direct message service
//!
//! One-to-one messages between users. Every insert or read-state change
//! is announced on the event bus so the recipient's badge updates.

use crate::db::repositories::{MessageRepository, UserRepository};
use crate::models::{ConversationSummary, ListParams, Message, ProfileSummary};
use crate::realtime::{EventBus, RealtimeAction, RealtimeEvent, RealtimeTable};
use crate::services::profile::ProfileService;
use crate::services::rate_limiter::RateLimiter;
use anyhow::Context;
use std::sync::Arc;

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum MessageServiceError {
    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Too many messages, slow down")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct MessageService {
    repo: Arc<dyn MessageRepository>,
    user_repo: Arc<dyn UserRepository>,
    profiles: Arc<ProfileService>,
    events: EventBus,
    send_limiter: RateLimiter,
}

impl MessageService {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        user_repo: Arc<dyn UserRepository>,
        profiles: Arc<ProfileService>,
        events: EventBus,
    ) -> Self {
        Self {
            repo,
            user_repo,
            profiles,
            events,
            send_limiter: RateLimiter::for_messages(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.send_limiter = limiter;
        self
    }

    pub async fn send(
        &self,
        sender_id: i64,
        recipient_id: i64,
        content: &str,
    ) -> Result<Message, MessageServiceError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MessageServiceError::ValidationError(
                "Message cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(MessageServiceError::ValidationError(format!(
                "Message cannot exceed {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        if sender_id == recipient_id {
            return Err(MessageServiceError::ValidationError(
                "Cannot send a message to yourself".to_string(),
            ));
        }
        if self
            .user_repo
            .get_by_id(recipient_id)
            .await
            .context("Failed to get recipient")?
            .is_none()
        {
            return Err(MessageServiceError::NotFound(recipient_id));
        }

        if !self.send_limiter.try_acquire(&sender_id.to_string()).await {
            tracing::warn!(sender_id, "Message sending rate limited");
            return Err(MessageServiceError::RateLimited);
        }

        let message = self
            .repo
            .create(sender_id, recipient_id, content)
            .await
            .context("Failed to send message")?;

        self.events.publish(RealtimeEvent::new(
            RealtimeTable::Messages,
            RealtimeAction::Insert,
            recipient_id,
        ));
        tracing::debug!(message_id = message.id, sender_id, recipient_id, "Message sent");
        Ok(message)
    }

    /// Messages between `user_id` and `other_id`, newest first
    pub async fn conversation(
        &self,
        user_id: i64,
        other_id: i64,
        params: &ListParams,
    ) -> Result<Vec<Message>, MessageServiceError> {
        Ok(self
            .repo
            .conversation(user_id, other_id, params)
            .await
            .context("Failed to load conversation")?)
    }

    /// Inbox: one entry per partner, most recent first
    pub async fn conversations(
        &self,
        user_id: i64,
    ) -> Result<Vec<ConversationSummary>, MessageServiceError> {
        let rows = self
            .repo
            .conversations(user_id)
            .await
            .context("Failed to list conversations")?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let partner = match self.profiles.summary(row.partner_id).await {
                Ok(Some(summary)) => summary,
                Ok(None) => ProfileSummary {
                    id: row.partner_id,
                    username: None,
                    full_name: None,
                    avatar_url: None,
                },
                Err(e) => return Err(MessageServiceError::InternalError(anyhow::anyhow!(e))),
            };
            summaries.push(ConversationSummary {
                partner,
                last_message: row.last_message,
                unread_count: row.unread_count,
            });
        }
        Ok(summaries)
    }

    /// Mark everything `other_id` sent to `user_id` as read
    pub async fn mark_conversation_read(
        &self,
        user_id: i64,
        other_id: i64,
    ) -> Result<u64, MessageServiceError> {
        let count = self
            .repo
            .mark_conversation_read(user_id, other_id)
            .await
            .context("Failed to mark conversation read")?;
        if count > 0 {
            self.publish_update(user_id);
        }
        Ok(count)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, MessageServiceError> {
        let count = self
            .repo
            .mark_all_read(user_id)
            .await
            .context("Failed to mark messages read")?;
        if count > 0 {
            self.publish_update(user_id);
        }
        Ok(count)
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, MessageServiceError> {
        Ok(self
            .repo
            .unread_count(user_id)
            .await
            .context("Failed to count unread messages")?)
    }

    /// Drop stale rate limiter windows
    pub async fn cleanup_rate_limits(&self) {
        self.send_limiter.cleanup().await;
    }

    fn publish_update(&self, user_id: i64) {
        self.events.publish(RealtimeEvent::new(
            RealtimeTable::Messages,
            RealtimeAction::Update,
            user_id,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};
    use crate::db::repositories::{SqlxMessageRepository, SqlxProfileRepository, SqlxUserRepository};
    use crate::db::DynDatabasePool;

    fn service(pool: &DynDatabasePool, events: EventBus) -> MessageService {
        let profiles = Arc::new(ProfileService::new(
            SqlxProfileRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new()),
        ));
        MessageService::new(
            SqlxMessageRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            profiles,
            events,
        )
    }

    #[tokio::test]
    async fn test_send_validates_and_publishes() {
        let pool = migrated_pool().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let service = service(&pool, events);

        assert!(matches!(
            service.send(alice, bob, "   ").await,
            Err(MessageServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.send(alice, alice, "hello me").await,
            Err(MessageServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.send(alice, 999, "hello?").await,
            Err(MessageServiceError::NotFound(999))
        ));

        let message = service.send(alice, bob, " hello bob ").await.unwrap();
        assert_eq!(message.content, "hello bob");
        assert!(!message.is_read);

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            RealtimeEvent::new(RealtimeTable::Messages, RealtimeAction::Insert, bob)
        );
        assert_eq!(service.unread_count(bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversations_and_read_state() {
        let pool = migrated_pool().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let carol = insert_user(&pool, "carol").await;
        let service = service(&pool, EventBus::new());

        service.send(alice, bob, "one").await.unwrap();
        service.send(alice, bob, "two").await.unwrap();
        service.send(carol, bob, "hi").await.unwrap();

        let inbox = service.conversations(bob).await.unwrap();
        assert_eq!(inbox.len(), 2);
        let from_alice = inbox
            .iter()
            .find(|c| c.partner.id == alice)
            .expect("conversation with alice");
        assert_eq!(from_alice.unread_count, 2);
        assert_eq!(from_alice.last_message.content, "two");
        assert_eq!(from_alice.partner.username.as_deref(), Some("alice"));

        let thread = service
            .conversation(bob, alice, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "two");

        assert_eq!(service.mark_conversation_read(bob, alice).await.unwrap(), 2);
        assert_eq!(service.unread_count(bob).await.unwrap(), 1);
        assert_eq!(service.mark_all_read(bob).await.unwrap(), 1);
        assert_eq!(service.unread_count(bob).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_publishes_only_on_change() {
        let pool = migrated_pool().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let service = service(&pool, events);

        assert_eq!(service.mark_all_read(bob).await.unwrap(), 0);
        assert_eq!(service.mark_conversation_read(bob, alice).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());

        service.send(alice, bob, "one").await.unwrap();
        assert_eq!(rx.try_recv().unwrap().action, RealtimeAction::Insert);

        assert_eq!(service.mark_all_read(bob).await.unwrap(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            RealtimeEvent::new(RealtimeTable::Messages, RealtimeAction::Update, bob)
        );
        assert_eq!(service.mark_all_read(bob).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_rate_limit() {
        let pool = migrated_pool().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let service = service(&pool, EventBus::new())
            .with_rate_limiter(RateLimiter::new(2, chrono::Duration::minutes(1)));

        service.send(alice, bob, "one").await.unwrap();
        service.send(alice, bob, "two").await.unwrap();
        assert!(matches!(
            service.send(alice, bob, "three").await,
            Err(MessageServiceError::RateLimited)
        ));
    }
}
