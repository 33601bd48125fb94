//! Notification service
//!
//! Records likes, comments, replies and follows addressed to a user and
//! pushes a realtime event so open badge sockets refresh.

use crate::db::repositories::NotificationRepository;
use crate::models::{ListParams, NewNotification, NotificationType, NotificationWithActor};
use crate::realtime::{EventBus, RealtimeAction, RealtimeEvent, RealtimeTable};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NotificationServiceError {
    #[error("Notification not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    events: EventBus,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Record a notification for `recipient_id`.
    ///
    /// Acting on your own content is silent: nothing is stored when the
    /// recipient is the actor.
    pub async fn notify(
        &self,
        recipient_id: i64,
        action_type: NotificationType,
        actor_id: i64,
        article_id: Option<i64>,
        comment_id: Option<i64>,
    ) -> Result<(), NotificationServiceError> {
        if recipient_id == actor_id {
            return Ok(());
        }

        let notification = self
            .repo
            .create(&NewNotification {
                user_id: recipient_id,
                action_type,
                action_user_id: actor_id,
                article_id,
                comment_id,
            })
            .await
            .context("Failed to create notification")?;

        tracing::debug!(
            notification_id = notification.id,
            recipient_id,
            %action_type,
            "Notification created"
        );
        self.events.publish(RealtimeEvent::new(
            RealtimeTable::Notifications,
            RealtimeAction::Insert,
            recipient_id,
        ));
        Ok(())
    }

    /// Like `notify`, but a failure is logged instead of returned. Used for
    /// side effects that must not undo the action that triggered them.
    pub async fn notify_quietly(
        &self,
        recipient_id: i64,
        action_type: NotificationType,
        actor_id: i64,
        article_id: Option<i64>,
        comment_id: Option<i64>,
    ) {
        if let Err(e) = self
            .notify(recipient_id, action_type, actor_id, article_id, comment_id)
            .await
        {
            tracing::warn!(recipient_id, %action_type, "Failed to send notification: {}", e);
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<Vec<NotificationWithActor>, NotificationServiceError> {
        Ok(self
            .repo
            .list_for_user(user_id, params)
            .await
            .context("Failed to list notifications")?)
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, NotificationServiceError> {
        Ok(self
            .repo
            .unread_count(user_id)
            .await
            .context("Failed to count unread notifications")?)
    }

    /// Mark one notification read. Someone else's notification looks the
    /// same as a missing one.
    pub async fn mark_read(&self, user_id: i64, id: i64) -> Result<(), NotificationServiceError> {
        let updated = self
            .repo
            .mark_read(user_id, id)
            .await
            .context("Failed to mark notification read")?;
        if !updated {
            return Err(NotificationServiceError::NotFound(id));
        }
        self.publish_update(user_id);
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, NotificationServiceError> {
        let count = self
            .repo
            .mark_all_read(user_id)
            .await
            .context("Failed to mark notifications read")?;
        self.publish_update(user_id);
        Ok(count)
    }

    fn publish_update(&self, user_id: i64) {
        self.events.publish(RealtimeEvent::new(
            RealtimeTable::Notifications,
            RealtimeAction::Update,
            user_id,
        ));
    }
}
