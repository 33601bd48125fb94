//! Article model
//!
//! Published articles, their read models, and the pagination types shared by
//! every listing endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileSummary;

/// Category used when a publish request names none
pub const DEFAULT_CATEGORY: &str = "general";

/// Fixed category catalogue as (slug, label)
pub const ARTICLE_CATEGORIES: &[(&str, &str)] = &[
    ("general", "General"),
    ("ancient-history", "Ancient History"),
    ("medieval-period", "Medieval Period"),
    ("renaissance", "Renaissance"),
    ("early-modern-period", "Early Modern Period"),
    ("industrial-age", "Industrial Age"),
    ("20th-century", "20th Century"),
    ("world-wars", "World Wars"),
    ("cold-war-era", "Cold War Era"),
    ("modern-history", "Modern History"),
];

/// Check whether `slug` names a known category
pub fn is_known_category(slug: &str) -> bool {
    ARTICLE_CATEGORIES.iter().any(|(s, _)| *s == slug)
}

/// Published article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Author (user id)
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    /// URL-friendly identifier (unique)
    pub slug: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub is_published: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article joined with its author's profile summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleWithAuthor {
    #[serde(flatten)]
    pub article: Article,
    pub author: Option<ProfileSummary>,
}

/// Everything the article page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub article: Article,
    pub author: Option<ProfileSummary>,
    pub like_count: i64,
    pub liked_by_me: bool,
    pub bookmarked_by_me: bool,
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

/// Input for publishing an article
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishArticleInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Row to insert; slug and excerpt are already resolved
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub category: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create pagination parameters; page is at least 1 and per_page 1..=100
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Row offset for `(page - 1) * per_page`
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn empty(params: &ListParams) -> Self {
        Self::new(Vec::new(), 0, params)
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }

    /// Whether rows exist past this page
    pub fn has_next(&self) -> bool {
        let seen = (self.page.saturating_sub(1) as i64) * self.per_page as i64
            + self.items.len() as i64;
        seen < self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// One page of the following feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub articles: Vec<ArticleWithAuthor>,
    pub page: u32,
    pub has_more: bool,
}

impl FeedPage {
    pub fn empty(page: u32) -> Self {
        Self {
            articles: Vec::new(),
            page,
            has_more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);

        let params = ListParams::new(3, 500);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_has_next_when_last_page_exactly_full() {
        let params = ListParams::new(2, 6);
        let page = PagedResult::new(vec![0; 6], 12, &params);
        assert!(!page.has_next());
        assert_eq!(page.total_pages(), 2);
    }

    #[test]
    fn test_known_categories() {
        assert!(is_known_category("cold-war-era"));
        assert!(is_known_category(DEFAULT_CATEGORY));
        assert!(!is_known_category("space-opera"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn has_next_matches_remaining_rows(
            total in 0i64..500,
            page in 1u32..40,
            per_page in 1u32..=100,
        ) {
            let params = ListParams::new(page, per_page);
            let start = params.offset().min(total);
            let len = (total - start).min(params.limit()).max(0) as usize;
            let result = PagedResult::new(vec![(); len], total, &params);

            prop_assert_eq!(result.has_next(), start + (len as i64) < total);
            prop_assert!(result.len() <= per_page as usize);
        }
    }
}
