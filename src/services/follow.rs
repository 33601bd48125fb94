//! Follow service

use crate::db::repositories::{FollowRepository, UserRepository};
use crate::models::{NotificationType, ProfileSummary};
use crate::services::notification::NotificationService;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FollowServiceError {
    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct FollowService {
    repo: Arc<dyn FollowRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl FollowService {
    pub fn new(
        repo: Arc<dyn FollowRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            user_repo,
            notifications,
        }
    }

    /// Follow `following_id`. Following twice is a no-op and only the
    /// first follow notifies.
    pub async fn follow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<(), FollowServiceError> {
        if follower_id == following_id {
            return Err(FollowServiceError::ValidationError(
                "You cannot follow yourself".to_string(),
            ));
        }
        if self
            .user_repo
            .get_by_id(following_id)
            .await
            .context("Failed to get user")?
            .is_none()
        {
            return Err(FollowServiceError::NotFound(following_id));
        }

        let created = self
            .repo
            .follow(follower_id, following_id)
            .await
            .context("Failed to follow user")?;
        if created {
            self.notifications
                .notify_quietly(following_id, NotificationType::Follow, follower_id, None, None)
                .await;
            tracing::debug!(follower_id, following_id, "User followed");
        }
        Ok(())
    }

    pub async fn unfollow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<(), FollowServiceError> {
        self.repo
            .unfollow(follower_id, following_id)
            .await
            .context("Failed to unfollow user")?;
        Ok(())
    }

    pub async fn is_following(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<bool, FollowServiceError> {
        Ok(self
            .repo
            .is_following(follower_id, following_id)
            .await
            .context("Failed to check follow")?)
    }

    pub async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, FollowServiceError> {
        Ok(self
            .repo
            .following_ids(user_id)
            .await
            .context("Failed to list followed users")?)
    }

    pub async fn followers(&self, user_id: i64) -> Result<Vec<ProfileSummary>, FollowServiceError> {
        Ok(self
            .repo
            .followers(user_id)
            .await
            .context("Failed to list followers")?)
    }

    pub async fn following(&self, user_id: i64) -> Result<Vec<ProfileSummary>, FollowServiceError> {
        Ok(self
            .repo
            .following(user_id)
            .await
            .context("Failed to list following")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};
    use crate::db::repositories::{
        SqlxFollowRepository, SqlxNotificationRepository, SqlxUserRepository,
    };
    use crate::realtime::EventBus;

    #[tokio::test]
    async fn test_follow_rules_and_single_notification() {
        let pool = migrated_pool().await;
        let reader = insert_user(&pool, "reader").await;
        let writer = insert_user(&pool, "writer").await;
        let notifications = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
            EventBus::new(),
        ));
        let service = FollowService::new(
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            notifications.clone(),
        );

        assert!(matches!(
            service.follow(reader, reader).await,
            Err(FollowServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.follow(reader, 999).await,
            Err(FollowServiceError::NotFound(999))
        ));

        service.follow(reader, writer).await.unwrap();
        service.follow(reader, writer).await.unwrap();
        assert!(service.is_following(reader, writer).await.unwrap());
        assert_eq!(notifications.unread_count(writer).await.unwrap(), 1);

        assert_eq!(service.following_ids(reader).await.unwrap(), vec![writer]);
        let followers = service.followers(writer).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username.as_deref(), Some("reader"));

        service.unfollow(reader, writer).await.unwrap();
        assert!(!service.is_following(reader, writer).await.unwrap());
        assert!(service.following(reader).await.unwrap().is_empty());
    }
}
