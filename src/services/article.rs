//! Article service
//!
//! Business logic around published articles:
//! - Publishing with slug generation and excerpt fallback
//! - The article page read model (author, likes, bookmark state, views)
//! - Like toggling with author notification
//! - Owner-only deletion

use crate::db::repositories::{ArticleRepository, BookmarkRepository, LikeRepository};
use crate::models::{
    is_known_category, Article, ArticleDetail, ArticleWithAuthor, BookmarkTarget, LikeToggle,
    ListParams, NewArticle, NotificationType, PagedResult, PublishArticleInput, DEFAULT_CATEGORY,
};
use crate::services::notification::NotificationService;
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Maximum excerpt length before truncation
pub const EXCERPT_LENGTH: usize = 150;

/// Slug used when a title has no word characters at all
const FALLBACK_SLUG: &str = "article";

/// Slugs that collide with static article routes (`/articles/id/{id}`)
const RESERVED_SLUGS: &[&str] = &["id"];

/// Attempts at inserting before a slug collision is reported as an error
const SLUG_ATTEMPTS: usize = 5;

static NON_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_\s]").expect("valid slug filter pattern")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Acting on another author's article
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Turn a title into a URL slug.
///
/// Lowercases, drops everything but word characters and whitespace, then
/// joins the remaining words with `-`.
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let slug = WHITESPACE_RUN.replace_all(stripped.trim(), "-").into_owned();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick the excerpt shown in listings.
///
/// A non-blank explicit excerpt wins; otherwise short content is used whole
/// and long content is cut at [`EXCERPT_LENGTH`] characters plus `...`.
pub fn make_excerpt(excerpt: Option<&str>, content: &str) -> String {
    if let Some(excerpt) = excerpt.map(str::trim).filter(|e| !e.is_empty()) {
        return excerpt.to_string();
    }
    if content.chars().count() <= EXCERPT_LENGTH {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(EXCERPT_LENGTH).collect();
    cut.push_str("...");
    cut
}

/// Sign-in path that returns to the article afterwards
pub fn sign_in_redirect(slug: &str) -> String {
    format!(
        "/signin?redirect={}",
        urlencoding::encode(&format!("/articles/{}", slug))
    )
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    like_repo: Arc<dyn LikeRepository>,
    bookmark_repo: Arc<dyn BookmarkRepository>,
    notifications: Arc<NotificationService>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        like_repo: Arc<dyn LikeRepository>,
        bookmark_repo: Arc<dyn BookmarkRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            like_repo,
            bookmark_repo,
            notifications,
        }
    }

    /// Publish a new article for `user_id`
    pub async fn publish(
        &self,
        user_id: i64,
        input: PublishArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Content cannot be empty".to_string(),
            ));
        }

        let category = match input.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };
        if !is_known_category(&category) {
            return Err(ArticleServiceError::ValidationError(format!(
                "Unknown category: {}",
                category
            )));
        }

        let base_slug = generate_slug(&title);
        let excerpt = make_excerpt(input.excerpt.as_deref(), &input.content);
        let image_url = input
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let mut new_article = NewArticle {
            user_id,
            title,
            content: input.content,
            excerpt,
            slug: String::new(),
            category,
            image_url,
            published_at: Utc::now(),
        };

        // A concurrent publish may claim the slug between the check and the insert
        let mut attempt = 1;
        let article = loop {
            new_article.slug = self.unique_slug(&base_slug).await?;
            match self.repo.create(&new_article).await {
                Ok(article) => break article,
                Err(e) if is_unique_violation(&e) && attempt < SLUG_ATTEMPTS => {
                    tracing::debug!(slug = %new_article.slug, attempt, "Slug taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(article_id = article.id, slug = %article.slug, "Article published");
        Ok(article)
    }

    /// First free slug among `base`, `base-2`, `base-3`, ...
    async fn unique_slug(&self, base: &str) -> Result<String, ArticleServiceError> {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while RESERVED_SLUGS.contains(&candidate.as_str())
            || self
                .repo
                .slug_exists(&candidate)
                .await
                .context("Failed to check slug")?
        {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn published_by_slug(
        &self,
        slug: &str,
    ) -> Result<ArticleWithAuthor, ArticleServiceError> {
        self.repo
            .get_published_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .ok_or_else(|| ArticleServiceError::NotFound(slug.to_string()))
    }

    /// Load the article page and count the view
    pub async fn view_by_slug(
        &self,
        slug: &str,
        viewer_id: Option<i64>,
    ) -> Result<ArticleDetail, ArticleServiceError> {
        let ArticleWithAuthor {
            mut article,
            author,
        } = self.published_by_slug(slug).await?;

        let like_count = self
            .like_repo
            .count_for_article(article.id)
            .await
            .context("Failed to count likes")?;

        let (liked_by_me, bookmarked_by_me) = match viewer_id {
            Some(viewer) => {
                let liked = self
                    .like_repo
                    .is_liked(viewer, article.id)
                    .await
                    .context("Failed to check like")?;
                let bookmarked = self
                    .bookmark_repo
                    .exists(viewer, BookmarkTarget::Article(article.id))
                    .await
                    .context("Failed to check bookmark")?;
                (liked, bookmarked)
            }
            None => (false, false),
        };

        article.view_count = self
            .repo
            .increment_view_count(article.id)
            .await
            .context("Failed to increment view count")?;

        Ok(ArticleDetail {
            article,
            author,
            like_count,
            liked_by_me,
            bookmarked_by_me,
        })
    }

    /// Like the article if `user_id` has not, otherwise remove the like.
    /// The returned count is read back after the write.
    pub async fn toggle_like(
        &self,
        user_id: i64,
        slug: &str,
    ) -> Result<LikeToggle, ArticleServiceError> {
        let article = self.published_by_slug(slug).await?.article;

        let was_liked = self
            .like_repo
            .is_liked(user_id, article.id)
            .await
            .context("Failed to check like")?;

        let liked = if was_liked {
            self.like_repo
                .unlike(user_id, article.id)
                .await
                .context("Failed to remove like")?;
            false
        } else {
            let inserted = self
                .like_repo
                .like(user_id, article.id)
                .await
                .context("Failed to add like")?;
            if inserted {
                self.notifications
                    .notify_quietly(
                        article.user_id,
                        NotificationType::Like,
                        user_id,
                        Some(article.id),
                        None,
                    )
                    .await;
            }
            true
        };

        let like_count = self
            .like_repo
            .count_for_article(article.id)
            .await
            .context("Failed to count likes")?;

        tracing::debug!(article_id = article.id, user_id, liked, "Like toggled");
        Ok(LikeToggle { liked, like_count })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }

    /// Delete an article; only its author may
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), ArticleServiceError> {
        let article = self.get_by_id(id).await?;
        if article.user_id != user_id {
            return Err(ArticleServiceError::Forbidden(
                "Only the author can delete this article".to_string(),
            ));
        }
        self.repo
            .delete(id)
            .await
            .context("Failed to delete article")?;
        tracing::info!(article_id = id, "Article deleted");
        Ok(())
    }

    pub async fn list_by_author(
        &self,
        user_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<ArticleWithAuthor>, ArticleServiceError> {
        let (items, total) = self
            .repo
            .list_by_authors(&[user_id], params)
            .await
            .context("Failed to list articles by author")?;
        Ok(PagedResult::new(items, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_article, insert_user, migrated_pool};
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxBookmarkRepository, SqlxLikeRepository,
        SqlxNotificationRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::realtime::EventBus;
    use proptest::prelude::*;

    fn service(pool: &DynDatabasePool) -> (ArticleService, Arc<NotificationService>) {
        let notifications = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
            EventBus::new(),
        ));
        let articles = ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxBookmarkRepository::boxed(pool.clone()),
            notifications.clone(),
        );
        (articles, notifications)
    }

    fn input(title: &str, content: &str) -> PublishArticleInput {
        PublishArticleInput {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("The Fall of Rome!"), "the-fall-of-rome");
        assert_eq!(generate_slug("  Spaces   everywhere  "), "spaces-everywhere");
        assert_eq!(generate_slug("1848: Year of Revolutions"), "1848-year-of-revolutions");
        assert_eq!(generate_slug("?!"), "article");
    }

    #[test]
    fn test_make_excerpt() {
        assert_eq!(make_excerpt(Some("Given"), "body"), "Given");
        assert_eq!(make_excerpt(Some("   "), "short body"), "short body");

        let long = "x".repeat(200);
        let excerpt = make_excerpt(None, &long);
        assert_eq!(excerpt.chars().count(), EXCERPT_LENGTH + 3);
        assert!(excerpt.ends_with("..."));

        let exact = "y".repeat(EXCERPT_LENGTH);
        assert_eq!(make_excerpt(None, &exact), exact);
    }

    #[test]
    fn test_sign_in_redirect() {
        assert_eq!(
            sign_in_redirect("the-fall-of-rome"),
            "/signin?redirect=%2Farticles%2Fthe-fall-of-rome"
        );
    }

    proptest! {
        #[test]
        fn slugs_are_url_safe(title in "\\PC{0,80}") {
            let slug = generate_slug(&title);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn excerpt_never_exceeds_limit(content in "\\PC{0,400}") {
            let excerpt = make_excerpt(None, &content);
            prop_assert!(excerpt.chars().count() <= EXCERPT_LENGTH + 3);
            if content.chars().count() <= EXCERPT_LENGTH {
                prop_assert_eq!(excerpt, content);
            }
        }
    }

    #[tokio::test]
    async fn test_publish_defaults_and_slug_collisions() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "herodotus").await;
        let (service, _) = service(&pool);

        let first = service
            .publish(author, input("The Histories", "Book one"))
            .await
            .unwrap();
        assert_eq!(first.slug, "the-histories");
        assert_eq!(first.category.as_deref(), Some(DEFAULT_CATEGORY));
        assert_eq!(first.excerpt.as_deref(), Some("Book one"));
        assert!(first.is_published);
        assert_eq!(first.view_count, 0);

        let second = service
            .publish(author, input("The Histories", "Book two"))
            .await
            .unwrap();
        assert_eq!(second.slug, "the-histories-2");

        let third = service
            .publish(author, input("The Histories!", "Book three"))
            .await
            .unwrap();
        assert_eq!(third.slug, "the-histories-3");
    }

    #[tokio::test]
    async fn test_reserved_slug_is_skipped() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "herodotus").await;
        let (service, _) = service(&pool);

        let article = service.publish(author, input("ID", "Identity")).await.unwrap();
        assert_eq!(article.slug, "id-2");
        let again = service.publish(author, input("Id", "Again")).await.unwrap();
        assert_eq!(again.slug, "id-3");
    }

    /// Reports every slug as free for the first `stale` checks, like a
    /// publish that lost the race against a concurrent insert
    struct StaleSlugRepository {
        inner: Arc<dyn ArticleRepository>,
        stale: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ArticleRepository for StaleSlugRepository {
        async fn create(&self, article: &NewArticle) -> anyhow::Result<Article> {
            self.inner.create(article).await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Article>> {
            self.inner.get_by_id(id).await
        }

        async fn get_published_by_slug(
            &self,
            slug: &str,
        ) -> anyhow::Result<Option<ArticleWithAuthor>> {
            self.inner.get_published_by_slug(slug).await
        }

        async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool> {
            use std::sync::atomic::Ordering;
            let stale = self.stale.load(Ordering::SeqCst);
            if stale > 0 {
                self.stale.store(stale - 1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.slug_exists(slug).await
        }

        async fn increment_view_count(&self, id: i64) -> anyhow::Result<i64> {
            self.inner.increment_view_count(id).await
        }

        async fn delete(&self, id: i64) -> anyhow::Result<()> {
            self.inner.delete(id).await
        }

        async fn list_published(
            &self,
            category: Option<&str>,
            params: &ListParams,
        ) -> anyhow::Result<(Vec<ArticleWithAuthor>, i64)> {
            self.inner.list_published(category, params).await
        }

        async fn list_by_authors(
            &self,
            author_ids: &[i64],
            params: &ListParams,
        ) -> anyhow::Result<(Vec<ArticleWithAuthor>, i64)> {
            self.inner.list_by_authors(author_ids, params).await
        }
    }

    #[tokio::test]
    async fn test_publish_retries_when_slug_is_taken_after_check() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "herodotus").await;
        let (service, notifications) = service(&pool);
        service
            .publish(author, input("The Histories", "Book one"))
            .await
            .unwrap();

        let stale = ArticleService::new(
            Arc::new(StaleSlugRepository {
                inner: SqlxArticleRepository::boxed(pool.clone()),
                stale: std::sync::atomic::AtomicUsize::new(1),
            }),
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxBookmarkRepository::boxed(pool.clone()),
            notifications,
        );
        let second = stale
            .publish(author, input("The Histories", "Book two"))
            .await
            .unwrap();
        assert_eq!(second.slug, "the-histories-2");
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_repeated_collisions() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "herodotus").await;
        let (service, notifications) = service(&pool);
        service
            .publish(author, input("The Histories", "Book one"))
            .await
            .unwrap();

        let stale = ArticleService::new(
            Arc::new(StaleSlugRepository {
                inner: SqlxArticleRepository::boxed(pool.clone()),
                stale: std::sync::atomic::AtomicUsize::new(usize::MAX),
            }),
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxBookmarkRepository::boxed(pool.clone()),
            notifications,
        );
        assert!(matches!(
            stale.publish(author, input("The Histories", "Book two")).await,
            Err(ArticleServiceError::InternalError(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_validation() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "herodotus").await;
        let (service, _) = service(&pool);

        assert!(matches!(
            service.publish(author, input("  ", "body")).await,
            Err(ArticleServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.publish(author, input("Title", "")).await,
            Err(ArticleServiceError::ValidationError(_))
        ));

        let mut unknown = input("Title", "body");
        unknown.category = Some("space-opera".to_string());
        assert!(matches!(
            service.publish(author, unknown).await,
            Err(ArticleServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_view_counts_and_reports_viewer_state() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let reader = insert_user(&pool, "reader").await;
        insert_article(&pool, author, "rome", "general", 0).await;
        let (service, _) = service(&pool);

        let anonymous = service.view_by_slug("rome", None).await.unwrap();
        assert_eq!(anonymous.article.view_count, 1);
        assert!(!anonymous.liked_by_me);
        assert_eq!(
            anonymous.author.and_then(|a| a.username),
            Some("author".to_string())
        );

        service.toggle_like(reader, "rome").await.unwrap();
        let seen = service.view_by_slug("rome", Some(reader)).await.unwrap();
        assert_eq!(seen.article.view_count, 2);
        assert!(seen.liked_by_me);
        assert!(!seen.bookmarked_by_me);
        assert_eq!(seen.like_count, 1);

        assert!(matches!(
            service.view_by_slug("missing", None).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_state() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let reader = insert_user(&pool, "reader").await;
        insert_article(&pool, author, "rome", "general", 0).await;
        let (service, notifications) = service(&pool);

        let liked = service.toggle_like(reader, "rome").await.unwrap();
        assert_eq!(
            liked,
            LikeToggle {
                liked: true,
                like_count: 1
            }
        );
        assert_eq!(notifications.unread_count(author).await.unwrap(), 1);

        let unliked = service.toggle_like(reader, "rome").await.unwrap();
        assert_eq!(
            unliked,
            LikeToggle {
                liked: false,
                like_count: 0
            }
        );

        // Liking your own article is not a notification
        service.toggle_like(author, "rome").await.unwrap();
        assert_eq!(notifications.unread_count(author).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_owner_only() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let other = insert_user(&pool, "other").await;
        let id = insert_article(&pool, author, "rome", "general", 0).await;
        let (service, _) = service(&pool);

        assert!(matches!(
            service.delete(other, id).await,
            Err(ArticleServiceError::Forbidden(_))
        ));
        service.delete(author, id).await.unwrap();
        assert!(matches!(
            service.get_by_id(id).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_author() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "author").await;
        let other = insert_user(&pool, "other").await;
        insert_article(&pool, author, "one", "general", 10).await;
        insert_article(&pool, author, "two", "general", 5).await;
        insert_article(&pool, other, "three", "general", 0).await;
        let (service, _) = service(&pool);

        let page = service
            .list_by_author(author, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].article.slug, "two");
    }
}
