//! Draft service
//!
//! Drafts are private to their author. Publishing a draft goes through the
//! article service so published drafts get the same slug and excerpt rules.

use crate::db::repositories::DraftRepository;
use crate::models::{Article, Draft, DraftInput, PublishArticleInput};
use crate::services::article::{ArticleService, ArticleServiceError};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DraftServiceError {
    #[error("Draft not found or no permission: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Draft already published: {0}")]
    Conflict(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ArticleServiceError> for DraftServiceError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::ValidationError(msg) => DraftServiceError::ValidationError(msg),
            ArticleServiceError::InternalError(e) => DraftServiceError::InternalError(e),
            other => DraftServiceError::InternalError(anyhow::anyhow!(other)),
        }
    }
}

/// Trim every field, turning blanks into `None`
fn normalize(input: DraftInput) -> DraftInput {
    fn clean(v: Option<String>) -> Option<String> {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
    DraftInput {
        title: clean(input.title),
        // Content keeps its inner whitespace; only blank content is dropped
        content: input.content.filter(|c| !c.trim().is_empty()),
        excerpt: clean(input.excerpt),
        category: clean(input.category),
        image_url: clean(input.image_url),
    }
}

pub struct DraftService {
    repo: Arc<dyn DraftRepository>,
    articles: Arc<ArticleService>,
}

impl DraftService {
    pub fn new(repo: Arc<dyn DraftRepository>, articles: Arc<ArticleService>) -> Self {
        Self { repo, articles }
    }

    pub async fn create(
        &self,
        user_id: i64,
        input: DraftInput,
    ) -> Result<Draft, DraftServiceError> {
        let draft = self
            .repo
            .create(user_id, &normalize(input))
            .await
            .context("Failed to create draft")?;
        tracing::debug!(draft_id = draft.id, user_id, "Draft created");
        Ok(draft)
    }

    /// A draft owned by `user_id`; someone else's draft is reported missing
    pub async fn get(&self, user_id: i64, id: i64) -> Result<Draft, DraftServiceError> {
        self.repo
            .get_owned(user_id, id)
            .await
            .context("Failed to get draft")?
            .ok_or(DraftServiceError::NotFound(id))
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Draft>, DraftServiceError> {
        Ok(self
            .repo
            .list_by_user(user_id)
            .await
            .context("Failed to list drafts")?)
    }

    /// Save an edit. A title is required to save.
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: DraftInput,
    ) -> Result<Draft, DraftServiceError> {
        let input = normalize(input);
        if input.title.is_none() {
            return Err(DraftServiceError::ValidationError(
                "Title is required".to_string(),
            ));
        }
        self.repo
            .update(user_id, id, &input)
            .await
            .context("Failed to update draft")?
            .ok_or(DraftServiceError::NotFound(id))
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), DraftServiceError> {
        let deleted = self
            .repo
            .delete(user_id, id)
            .await
            .context("Failed to delete draft")?;
        if !deleted {
            return Err(DraftServiceError::NotFound(id));
        }
        Ok(())
    }

    /// Publish the draft as an article and link the two
    pub async fn publish(&self, user_id: i64, id: i64) -> Result<Article, DraftServiceError> {
        let draft = self.get(user_id, id).await?;
        if draft.is_published {
            return Err(DraftServiceError::Conflict(id));
        }

        let (title, content, category) = match (draft.title, draft.content, draft.category) {
            (Some(title), Some(content), Some(category)) => (title, content, category),
            _ => {
                return Err(DraftServiceError::ValidationError(
                    "Title, content and category are required to publish".to_string(),
                ))
            }
        };

        let article = self
            .articles
            .publish(
                user_id,
                PublishArticleInput {
                    title,
                    content,
                    excerpt: draft.excerpt,
                    category: Some(category),
                    image_url: draft.image_url,
                },
            )
            .await?;

        self.repo
            .mark_published(id, article.id)
            .await
            .context("Failed to mark draft published")?;

        tracing::info!(draft_id = id, article_id = article.id, "Draft published");
        Ok(article)
    }
}
