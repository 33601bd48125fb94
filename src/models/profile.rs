//! Profile model
//!
//! Profiles carry the public identity of a user: handle, name, avatar and
//! social links. `ProfileSummary` is the slice embedded next to articles,
//! comments, messages and notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full profile row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the owning user's id
    pub id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Empty profile for a freshly registered user
    pub fn empty(id: i64, username: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            full_name: None,
            avatar_url: None,
            bio: None,
            website: None,
            twitter: None,
            github: None,
            linkedin: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Social links that are set, as (network, url) pairs
    pub fn social_links(&self) -> Vec<(&'static str, String)> {
        let mut links = Vec::new();
        if let Some(handle) = non_blank(&self.twitter) {
            links.push(("twitter", format!("https://twitter.com/{}", handle)));
        }
        if let Some(handle) = non_blank(&self.github) {
            links.push(("github", format!("https://github.com/{}", handle)));
        }
        if let Some(handle) = non_blank(&self.linkedin) {
            links.push(("linkedin", format!("https://www.linkedin.com/in/{}", handle)));
        }
        if let Some(url) = non_blank(&self.website) {
            links.push(("website", url.to_string()));
        }
        links
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Author/actor info embedded in other responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileSummary {
    /// Full name, else username, else "Anonymous"
    pub fn display_name(&self) -> String {
        non_blank(&self.full_name)
            .or_else(|| non_blank(&self.username))
            .unwrap_or("Anonymous")
            .to_string()
    }

    /// Uppercased first letter of the username or full name, else "U"
    pub fn avatar_initial(&self) -> String {
        non_blank(&self.username)
            .or_else(|| non_blank(&self.full_name))
            .and_then(|name| name.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "U".to_string())
    }

    /// "@username", else "@" + local part of the email, else "@user"
    pub fn handle(&self, email: Option<&str>) -> String {
        if let Some(username) = non_blank(&self.username) {
            return format!("@{}", username);
        }
        match email.and_then(|e| e.split('@').next()).filter(|l| !l.is_empty()) {
            Some(local) => format!("@{}", local),
            None => "@user".to_string(),
        }
    }
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

/// Follower/following/article counters shown on a profile page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub followers: i64,
    pub following: i64,
    pub articles: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(username: Option<&str>, full_name: Option<&str>) -> ProfileSummary {
        ProfileSummary {
            id: 1,
            username: username.map(String::from),
            full_name: full_name.map(String::from),
            avatar_url: None,
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(summary(Some("ada"), Some("Ada Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(summary(Some("ada"), None).display_name(), "ada");
        assert_eq!(summary(None, Some("  ")).display_name(), "Anonymous");
        assert_eq!(summary(None, None).display_name(), "Anonymous");
    }

    #[test]
    fn test_avatar_initial() {
        assert_eq!(summary(Some("herodotus"), Some("Zed")).avatar_initial(), "H");
        assert_eq!(summary(None, Some("édouard")).avatar_initial(), "É");
        assert_eq!(summary(None, None).avatar_initial(), "U");
    }

    #[test]
    fn test_handle() {
        assert_eq!(summary(Some("livy"), None).handle(Some("x@y.z")), "@livy");
        assert_eq!(summary(None, None).handle(Some("tacitus@rome.it")), "@tacitus");
        assert_eq!(summary(None, None).handle(None), "@user");
    }

    #[test]
    fn test_social_links_skip_blank() {
        let mut profile = Profile::empty(1, None);
        profile.github = Some("lostlib".to_string());
        profile.twitter = Some("  ".to_string());

        let links = profile.social_links();
        assert_eq!(links, vec![("github", "https://github.com/lostlib".to_string())]);
    }
}
