//! Bookmark service
//!
//! Saves articles and community posts for later reading.

use crate::db::repositories::{ArticleRepository, BookmarkRepository, CommunityRepository};
use crate::models::{BookmarkEntry, BookmarkTarget};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BookmarkServiceError {
    #[error("Bookmark target not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct BookmarkService {
    repo: Arc<dyn BookmarkRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    community_repo: Arc<dyn CommunityRepository>,
}

impl BookmarkService {
    pub fn new(
        repo: Arc<dyn BookmarkRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        community_repo: Arc<dyn CommunityRepository>,
    ) -> Self {
        Self {
            repo,
            article_repo,
            community_repo,
        }
    }

    /// Bookmark the article or remove its bookmark; returns the new state
    pub async fn toggle_article(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<bool, BookmarkServiceError> {
        if self
            .article_repo
            .get_by_id(article_id)
            .await
            .context("Failed to get article")?
            .is_none()
        {
            return Err(BookmarkServiceError::NotFound(format!("article {}", article_id)));
        }
        self.toggle(user_id, BookmarkTarget::Article(article_id)).await
    }

    /// Bookmark the community post or remove its bookmark
    pub async fn toggle_post(
        &self,
        user_id: i64,
        post_id: i64,
    ) -> Result<bool, BookmarkServiceError> {
        if self
            .community_repo
            .get_post(post_id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(BookmarkServiceError::NotFound(format!("post {}", post_id)));
        }
        self.toggle(user_id, BookmarkTarget::Post(post_id)).await
    }

    async fn toggle(
        &self,
        user_id: i64,
        target: BookmarkTarget,
    ) -> Result<bool, BookmarkServiceError> {
        let removed = self
            .repo
            .remove(user_id, target)
            .await
            .context("Failed to remove bookmark")?;
        if removed {
            return Ok(false);
        }
        self.repo
            .add(user_id, target)
            .await
            .context("Failed to add bookmark")?;
        Ok(true)
    }

    /// Bookmarks with their target titles, newest first
    pub async fn list(&self, user_id: i64) -> Result<Vec<BookmarkEntry>, BookmarkServiceError> {
        Ok(self
            .repo
            .list_for_user(user_id)
            .await
            .context("Failed to list bookmarks")?)
    }
}
