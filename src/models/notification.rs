//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileSummary;

/// What the actor did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
    Reply,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Reply => "reply",
            NotificationType::Follow => "follow",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(NotificationType::Like),
            "comment" => Some(NotificationType::Comment),
            "reply" => Some(NotificationType::Reply),
            "follow" => Some(NotificationType::Follow),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    pub action_type: NotificationType,
    pub action_user_id: i64,
    pub article_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification plus the actor's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationWithActor {
    #[serde(flatten)]
    pub notification: Notification,
    pub actor: Option<ProfileSummary>,
    /// Slug of the referenced article, for linking
    pub article_slug: Option<String>,
}

/// Insert payload
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub action_type: NotificationType,
    pub action_user_id: i64,
    pub article_id: Option<i64>,
    pub comment_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_str() {
        for kind in [
            NotificationType::Like,
            NotificationType::Comment,
            NotificationType::Reply,
            NotificationType::Follow,
        ] {
            assert_eq!(NotificationType::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationType::from_str("poke"), None);
    }
}
