//! Shared API response types
//!
//! Common response structures used across endpoints so listings and
//! user payloads look the same everywhere.

use serde::Serialize;

use crate::models::{PagedResult, Profile, ProfileStats, ProfileSummary, User};

// ============================================================================
// User / Profile Response Types
// ============================================================================

/// The signed-in user, as returned by auth endpoints
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
}

impl UserResponse {
    pub fn new(user: User, profile: Option<ProfileSummary>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            profile,
        }
    }
}

/// Profile page payload: the profile plus derived display fields and counters
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub display_name: String,
    pub avatar_initial: String,
    pub handle: String,
    pub social_links: Vec<SocialLink>,
    pub stats: ProfileStats,
}

#[derive(Debug, Serialize)]
pub struct SocialLink {
    pub platform: &'static str,
    pub url: String,
}

impl ProfileResponse {
    pub fn new(profile: Profile, stats: ProfileStats) -> Self {
        let summary = profile.summary();
        let social_links = profile
            .social_links()
            .into_iter()
            .map(|(platform, url)| SocialLink { platform, url })
            .collect();
        Self {
            display_name: summary.display_name(),
            avatar_initial: summary.avatar_initial(),
            handle: summary.handle(None),
            social_links,
            stats,
            profile,
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

impl<T> From<PagedResult<T>> for PaginatedResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        Self {
            total_pages: result.total_pages(),
            has_more: result.has_next(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            items: result.items,
        }
    }
}

/// `{ "count": n }`
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_paginated_response_from_paged_result() {
        let params = ListParams::new(1, 2);
        let response: PaginatedResponse<i32> =
            PagedResult::new(vec![1, 2], 5, &params).into();
        assert_eq!(response.total_pages, 3);
        assert!(response.has_more);
    }

    #[test]
    fn test_profile_response_display_fields() {
        let mut profile = Profile::empty(4, Some("hypatia".to_string()));
        profile.github = Some("hypatia".to_string());
        let response = ProfileResponse::new(profile, ProfileStats::default());
        assert_eq!(response.display_name, "hypatia");
        assert_eq!(response.avatar_initial, "H");
        assert_eq!(response.handle, "@hypatia");
        assert_eq!(response.social_links.len(), 1);
    }
}
