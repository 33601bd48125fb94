//! Feed service
//!
//! Two feeds over published articles:
//! - "for you": every published article, optionally narrowed to a category
//! - "following": articles by the users the reader follows, in fixed pages

use crate::db::repositories::{ArticleRepository, FollowRepository};
use crate::models::{ArticleWithAuthor, FeedPage, ListParams, PagedResult};
use anyhow::Context;
use std::sync::Arc;

/// Category value meaning "no filter"
const ALL_CATEGORIES: &str = "all";

/// Default page size of the following feed
pub const DEFAULT_FOLLOWING_PAGE_SIZE: u32 = 6;

#[derive(Debug, thiserror::Error)]
pub enum FeedServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct FeedService {
    article_repo: Arc<dyn ArticleRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    following_page_size: u32,
}

/// `None`, blank and `all` select every category
fn category_filter(category: Option<&str>) -> Option<&str> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES))
}

impl FeedService {
    pub fn new(
        article_repo: Arc<dyn ArticleRepository>,
        follow_repo: Arc<dyn FollowRepository>,
    ) -> Self {
        Self {
            article_repo,
            follow_repo,
            following_page_size: DEFAULT_FOLLOWING_PAGE_SIZE,
        }
    }

    pub fn with_following_page_size(mut self, size: u32) -> Self {
        self.following_page_size = size.max(1);
        self
    }

    /// Published articles newest first. An unknown category simply matches
    /// nothing.
    pub async fn for_you(
        &self,
        category: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<PagedResult<ArticleWithAuthor>, FeedServiceError> {
        let params = ListParams::new(page, per_page);
        let (items, total) = self
            .article_repo
            .list_published(category_filter(category), &params)
            .await
            .context("Failed to list feed articles")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// One page of articles written by people `follower_id` follows
    pub async fn following(
        &self,
        follower_id: i64,
        page: u32,
    ) -> Result<FeedPage, FeedServiceError> {
        let params = ListParams::new(page, self.following_page_size);

        let author_ids = self
            .follow_repo
            .following_ids(follower_id)
            .await
            .context("Failed to load followed users")?;
        if author_ids.is_empty() {
            return Ok(FeedPage::empty(params.page));
        }

        let (articles, total) = self
            .article_repo
            .list_by_authors(&author_ids, &params)
            .await
            .context("Failed to list following feed")?;

        let result = PagedResult::new(articles, total, &params);
        let has_more = result.has_next();
        tracing::debug!(
            follower_id,
            page = params.page,
            total,
            has_more,
            "Following feed page loaded"
        );
        Ok(FeedPage {
            articles: result.items,
            page: params.page,
            has_more,
        })
    }
}
