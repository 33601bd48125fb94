//! Comment service
//!
//! Threaded comments on articles. Community post comments share the
//! content rules defined here.

use crate::db::repositories::{ArticleRepository, CommentRepository};
use crate::models::{build_comment_tree, Comment, CommentNode, NotificationType};
use crate::services::notification::NotificationService;
use anyhow::Context;
use std::sync::Arc;

/// Maximum comment length in characters
pub const MAX_COMMENT_LENGTH: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Trim comment text and check its length
pub fn validate_comment_content(content: &str) -> Result<String, String> {
    let content = content.trim();
    if content.is_empty() {
        return Err("Comment cannot be empty".to_string());
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_LENGTH
        ));
    }
    Ok(content.to_string())
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            article_repo,
            notifications,
        }
    }

    /// Comment on an article, or reply to one of its comments
    pub async fn create(
        &self,
        user_id: i64,
        article_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment, CommentServiceError> {
        let content =
            validate_comment_content(content).map_err(CommentServiceError::ValidationError)?;

        let article = self
            .article_repo
            .get_by_id(article_id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("article {}", article_id)))?;

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self
                    .repo
                    .get_by_id(parent_id)
                    .await
                    .context("Failed to get parent comment")?
                    .filter(|p| p.target_id == article_id)
                    .ok_or_else(|| {
                        CommentServiceError::ValidationError(
                            "Parent comment does not belong to this article".to_string(),
                        )
                    })?;
                Some(parent)
            }
            None => None,
        };

        let comment = self
            .repo
            .create(user_id, article_id, parent_id, &content)
            .await
            .context("Failed to create comment")?;

        if let Some(ref parent) = parent {
            self.notifications
                .notify_quietly(
                    parent.user_id,
                    NotificationType::Reply,
                    user_id,
                    Some(article_id),
                    Some(comment.id),
                )
                .await;
        }
        // A reply to the author's own comment already reached them as a reply
        if parent.as_ref().map(|p| p.user_id) != Some(article.user_id) {
            self.notifications
                .notify_quietly(
                    article.user_id,
                    NotificationType::Comment,
                    user_id,
                    Some(article_id),
                    Some(comment.id),
                )
                .await;
        }

        tracing::debug!(comment_id = comment.id, article_id, "Comment created");
        Ok(comment)
    }

    /// Comment tree of an article, oldest first at every level
    pub async fn list_for_article(
        &self,
        article_id: i64,
    ) -> Result<Vec<CommentNode>, CommentServiceError> {
        let flat = self
            .repo
            .list_for_target(article_id)
            .await
            .context("Failed to list comments")?;
        Ok(build_comment_tree(flat))
    }

    pub async fn count_for_article(&self, article_id: i64) -> Result<i64, CommentServiceError> {
        Ok(self
            .repo
            .count_for_target(article_id)
            .await
            .context("Failed to count comments")?)
    }

    /// Delete a comment and its replies; only its author may
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", id)))?;
        if comment.user_id != user_id {
            return Err(CommentServiceError::Forbidden(
                "Only the author can delete this comment".to_string(),
            ));
        }
        self.repo.delete(id).await.context("Failed to delete comment")?;
        Ok(())
    }
}
