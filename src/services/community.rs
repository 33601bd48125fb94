//! Community service
//!
//! Communities, memberships, posts and post comments. Only members may
//! post or comment; the creator is an admin member and cannot leave.

use crate::db::repositories::{CommentRepository, CommunityRepository};
use crate::models::{
    build_comment_tree, Comment, CommentNode, Community, CommunityMember, CommunityPost,
    CommunityPostWithMeta, CommunityWithStats, CreateCommunityInput, ListParams, PagedResult,
};
use crate::services::comment::validate_comment_content;
use anyhow::Context;
use std::sync::Arc;

/// Maximum community name length in characters
pub const MAX_COMMUNITY_NAME_LENGTH: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CommunityServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Community name already taken: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct CommunityService {
    repo: Arc<dyn CommunityRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl CommunityService {
    /// `comment_repo` must be scoped to community post comments
    pub fn new(
        repo: Arc<dyn CommunityRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self { repo, comment_repo }
    }

    pub async fn create(
        &self,
        creator_id: i64,
        input: CreateCommunityInput,
    ) -> Result<Community, CommunityServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CommunityServiceError::ValidationError(
                "Community name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_COMMUNITY_NAME_LENGTH {
            return Err(CommunityServiceError::ValidationError(format!(
                "Community name cannot exceed {} characters",
                MAX_COMMUNITY_NAME_LENGTH
            )));
        }
        if self
            .repo
            .name_exists(&name)
            .await
            .context("Failed to check community name")?
        {
            return Err(CommunityServiceError::Conflict(name));
        }

        let input = CreateCommunityInput {
            name,
            description: input.description.trim().to_string(),
            category: clean(input.category),
            image_url: clean(input.image_url),
            banner_url: clean(input.banner_url),
        };
        let community = self
            .repo
            .create(creator_id, &input)
            .await
            .context("Failed to create community")?;

        tracing::info!(community_id = community.id, creator_id, "Community created");
        Ok(community)
    }

    pub async fn get(&self, id: i64) -> Result<CommunityWithStats, CommunityServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get community")?
            .ok_or_else(|| CommunityServiceError::NotFound(format!("community {}", id)))
    }

    pub async fn list(
        &self,
        category: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<CommunityWithStats>, CommunityServiceError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty() && *c != "all");
        let (items, total) = self
            .repo
            .list(category, params)
            .await
            .context("Failed to list communities")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Join a community; joining again is a no-op
    pub async fn join(&self, user_id: i64, community_id: i64) -> Result<(), CommunityServiceError> {
        self.get(community_id).await?;
        if self
            .repo
            .add_member(community_id, user_id)
            .await
            .context("Failed to join community")?
        {
            tracing::debug!(community_id, user_id, "Member joined");
        }
        Ok(())
    }

    pub async fn leave(
        &self,
        user_id: i64,
        community_id: i64,
    ) -> Result<(), CommunityServiceError> {
        let community = self.get(community_id).await?;
        if community.community.creator_id == user_id {
            return Err(CommunityServiceError::Forbidden(
                "The creator cannot leave their community".to_string(),
            ));
        }
        self.repo
            .remove_member(community_id, user_id)
            .await
            .context("Failed to leave community")?;
        Ok(())
    }

    pub async fn is_member(
        &self,
        user_id: i64,
        community_id: i64,
    ) -> Result<bool, CommunityServiceError> {
        Ok(self
            .repo
            .is_member(community_id, user_id)
            .await
            .context("Failed to check membership")?)
    }

    pub async fn members(
        &self,
        community_id: i64,
    ) -> Result<Vec<CommunityMember>, CommunityServiceError> {
        self.get(community_id).await?;
        Ok(self
            .repo
            .members(community_id)
            .await
            .context("Failed to list members")?)
    }

    async fn require_member(
        &self,
        user_id: i64,
        community_id: i64,
    ) -> Result<(), CommunityServiceError> {
        if !self.is_member(user_id, community_id).await? {
            return Err(CommunityServiceError::Forbidden(
                "Only members can do this".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create_post(
        &self,
        user_id: i64,
        community_id: i64,
        title: &str,
        content: &str,
    ) -> Result<CommunityPost, CommunityServiceError> {
        self.get(community_id).await?;
        self.require_member(user_id, community_id).await?;

        let title = title.trim();
        if title.is_empty() || content.trim().is_empty() {
            return Err(CommunityServiceError::ValidationError(
                "Title and content are required".to_string(),
            ));
        }

        let post = self
            .repo
            .create_post(community_id, user_id, title, content.trim())
            .await
            .context("Failed to create post")?;
        tracing::debug!(post_id = post.id, community_id, "Community post created");
        Ok(post)
    }

    /// Posts newest first with author and comment count
    pub async fn posts(
        &self,
        community_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<CommunityPostWithMeta>, CommunityServiceError> {
        let (items, total) = self
            .repo
            .list_posts(community_id, params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn get_post(&self, post_id: i64) -> Result<CommunityPost, CommunityServiceError> {
        self.repo
            .get_post(post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| CommunityServiceError::NotFound(format!("post {}", post_id)))
    }

    pub async fn comment_on_post(
        &self,
        user_id: i64,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment, CommunityServiceError> {
        let post = self.get_post(post_id).await?;
        self.require_member(user_id, post.community_id).await?;
        let content =
            validate_comment_content(content).map_err(CommunityServiceError::ValidationError)?;

        if let Some(parent_id) = parent_id {
            let same_post = self
                .comment_repo
                .get_by_id(parent_id)
                .await
                .context("Failed to get parent comment")?
                .is_some_and(|p| p.target_id == post_id);
            if !same_post {
                return Err(CommunityServiceError::ValidationError(
                    "Parent comment does not belong to this post".to_string(),
                ));
            }
        }

        Ok(self
            .comment_repo
            .create(user_id, post_id, parent_id, &content)
            .await
            .context("Failed to create post comment")?)
    }

    pub async fn post_comments(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentNode>, CommunityServiceError> {
        self.get_post(post_id).await?;
        let flat = self
            .comment_repo
            .list_for_target(post_id)
            .await
            .context("Failed to list post comments")?;
        Ok(build_comment_tree(flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};
    use crate::db::repositories::{CommentScope, SqlxCommentRepository, SqlxCommunityRepository};
    use crate::db::DynDatabasePool;

    fn service(pool: &DynDatabasePool) -> CommunityService {
        CommunityService::new(
            SqlxCommunityRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone(), CommentScope::CommunityPost),
        )
    }

    fn named(name: &str) -> CreateCommunityInput {
        CreateCommunityInput {
            name: name.to_string(),
            description: "Readers of old maps".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_validation_and_uniqueness() {
        let pool = migrated_pool().await;
        let creator = insert_user(&pool, "creator").await;
        let service = service(&pool);

        assert!(matches!(
            service.create(creator, named("  ")).await,
            Err(CommunityServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(creator, named(&"n".repeat(101))).await,
            Err(CommunityServiceError::ValidationError(_))
        ));

        let community = service.create(creator, named("Cartographers")).await.unwrap();
        assert!(matches!(
            service.create(creator, named("Cartographers")).await,
            Err(CommunityServiceError::Conflict(_))
        ));

        let loaded = service.get(community.id).await.unwrap();
        assert_eq!(loaded.member_count, 1);
        let members = service.members(community.id).await.unwrap();
        assert!(members[0].is_admin);
    }

    #[tokio::test]
    async fn test_membership_rules() {
        let pool = migrated_pool().await;
        let creator = insert_user(&pool, "creator").await;
        let reader = insert_user(&pool, "reader").await;
        let service = service(&pool);
        let community = service.create(creator, named("Cartographers")).await.unwrap();

        service.join(reader, community.id).await.unwrap();
        service.join(reader, community.id).await.unwrap();
        assert_eq!(service.get(community.id).await.unwrap().member_count, 2);

        assert!(matches!(
            service.leave(creator, community.id).await,
            Err(CommunityServiceError::Forbidden(_))
        ));
        service.leave(reader, community.id).await.unwrap();
        assert!(!service.is_member(reader, community.id).await.unwrap());

        assert!(matches!(
            service.join(reader, 999).await,
            Err(CommunityServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_and_comments_are_members_only() {
        let pool = migrated_pool().await;
        let creator = insert_user(&pool, "creator").await;
        let outsider = insert_user(&pool, "outsider").await;
        let service = service(&pool);
        let community = service.create(creator, named("Cartographers")).await.unwrap();

        assert!(matches!(
            service
                .create_post(outsider, community.id, "Hello", "Let me in")
                .await,
            Err(CommunityServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.create_post(creator, community.id, "", "body").await,
            Err(CommunityServiceError::ValidationError(_))
        ));

        let post = service
            .create_post(creator, community.id, "Mercator", "On projections")
            .await
            .unwrap();

        assert!(matches!(
            service.comment_on_post(outsider, post.id, "Nice", None).await,
            Err(CommunityServiceError::Forbidden(_))
        ));

        service.join(outsider, community.id).await.unwrap();
        let root = service
            .comment_on_post(outsider, post.id, "Nice", None)
            .await
            .unwrap();
        service
            .comment_on_post(creator, post.id, "Thanks", Some(root.id))
            .await
            .unwrap();

        let tree = service.post_comments(post.id).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 1);

        let posts = service
            .posts(community.id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(posts.total, 1);
        assert_eq!(posts.items[0].comment_count, 2);
    }
}
