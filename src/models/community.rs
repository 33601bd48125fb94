//! Community models: communities, memberships and posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub creator_id: i64,
    pub image_url: Option<String>,
    pub banner_url: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Community with its member count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityWithStats {
    #[serde(flatten)]
    pub community: Community,
    pub member_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCommunityInput {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMember {
    pub id: i64,
    pub community_id: i64,
    pub user_id: i64,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
    pub profile: Option<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: i64,
    pub community_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Post with author and comment count, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPostWithMeta {
    #[serde(flatten)]
    pub post: CommunityPost,
    pub author: Option<ProfileSummary>,
    pub comment_count: i64,
}
