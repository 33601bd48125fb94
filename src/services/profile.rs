//! Profile service
//!
//! Reads and edits profiles. Summaries (the slice embedded next to articles,
//! comments and messages) are cached under `profile:{id}` and invalidated
//! whenever the profile changes.

use crate::cache::{profile_key, CacheLayer, MemoryCache};
use crate::db::repositories::ProfileRepository;
use crate::models::{Profile, ProfileStats, ProfileSummary, UpdateProfileInput};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Username already taken: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Usernames are 3 to 30 characters of lowercase letters, digits and underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err("Username must be between 3 and 30 characters".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(
            "Username may only contain lowercase letters, numbers and underscores".to_string(),
        );
    }
    Ok(())
}

/// Websites are optional but must be http(s) URLs when given
pub fn validate_website(website: &str) -> Result<(), String> {
    if website.is_empty() || website.starts_with("http://") || website.starts_with("https://") {
        Ok(())
    } else {
        Err("Website must start with http:// or https://".to_string())
    }
}

/// Trim and turn blank strings into `None`
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
    cache: Arc<MemoryCache>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn ProfileRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn get(&self, id: i64) -> Result<Profile, ProfileServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get profile")?
            .ok_or_else(|| ProfileServiceError::NotFound(id.to_string()))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Profile, ProfileServiceError> {
        self.repo
            .get_by_username(username)
            .await
            .context("Failed to get profile by username")?
            .ok_or_else(|| ProfileServiceError::NotFound(username.to_string()))
    }

    /// Cached profile summary; `None` when the user has no profile
    pub async fn summary(&self, id: i64) -> Result<Option<ProfileSummary>, ProfileServiceError> {
        let key = profile_key(id);
        match self.cache.get::<ProfileSummary>(&key).await {
            Ok(Some(summary)) => return Ok(Some(summary)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached profile {}: {}", id, e),
        }

        let summary = self
            .repo
            .get_summary(id)
            .await
            .context("Failed to get profile summary")?;

        if let Some(ref summary) = summary {
            if let Err(e) = self.cache.set(&key, summary).await {
                tracing::warn!("Failed to cache profile {}: {}", id, e);
            }
        }
        Ok(summary)
    }

    /// Apply an edit. Fields absent from `input` keep their value; blank
    /// strings clear optional fields.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateProfileInput,
    ) -> Result<Profile, ProfileServiceError> {
        let mut profile = self.get(id).await?;

        if let Some(username) = input.username {
            let username = username.trim().to_string();
            validate_username(&username).map_err(ProfileServiceError::ValidationError)?;
            if self
                .repo
                .username_taken(&username, Some(id))
                .await
                .context("Failed to check username")?
            {
                return Err(ProfileServiceError::Conflict(username));
            }
            profile.username = Some(username);
        }

        if let Some(website) = input.website {
            let website = website.trim().to_string();
            validate_website(&website).map_err(ProfileServiceError::ValidationError)?;
            profile.website = clean(Some(website));
        }

        if input.full_name.is_some() {
            profile.full_name = clean(input.full_name);
        }
        if input.avatar_url.is_some() {
            profile.avatar_url = clean(input.avatar_url);
        }
        if input.bio.is_some() {
            profile.bio = clean(input.bio);
        }
        if input.twitter.is_some() {
            profile.twitter = clean(input.twitter);
        }
        if input.github.is_some() {
            profile.github = clean(input.github);
        }
        if input.linkedin.is_some() {
            profile.linkedin = clean(input.linkedin);
        }

        let updated = self
            .repo
            .update(&profile)
            .await
            .context("Failed to update profile")?;

        if let Err(e) = self.cache.delete(&profile_key(id)).await {
            tracing::warn!("Failed to invalidate cached profile {}: {}", id, e);
        }
        tracing::info!(profile_id = id, "Profile updated");
        Ok(updated)
    }

    pub async fn stats(&self, id: i64) -> Result<ProfileStats, ProfileServiceError> {
        Ok(self
            .repo
            .stats(id)
            .await
            .context("Failed to get profile stats")?)
    }
}
