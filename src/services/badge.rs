//! Unread badges for the navigation bar

use crate::services::message::{MessageService, MessageServiceError};
use crate::services::notification::{NotificationService, NotificationServiceError};
use serde::Serialize;
use std::sync::Arc;

/// Counts above this render as "99+"
const BADGE_CAP: i64 = 99;

/// Text shown on a badge, or `None` when there is nothing unread
pub fn badge_label(count: i64) -> Option<String> {
    match count {
        c if c <= 0 => None,
        c if c > BADGE_CAP => Some(format!("{}+", BADGE_CAP)),
        c => Some(c.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BadgeServiceError {
    #[error(transparent)]
    Messages(#[from] MessageServiceError),

    #[error(transparent)]
    Notifications(#[from] NotificationServiceError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadgeCounts {
    pub messages: i64,
    pub notifications: i64,
}

/// Wire payload pushed over the realtime socket and returned by the poll endpoint
#[derive(Debug, Clone, Serialize)]
pub struct BadgePayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub messages: i64,
    pub notifications: i64,
    pub messages_label: Option<String>,
    pub notifications_label: Option<String>,
}

impl From<BadgeCounts> for BadgePayload {
    fn from(counts: BadgeCounts) -> Self {
        Self {
            kind: "badges",
            messages: counts.messages,
            notifications: counts.notifications,
            messages_label: badge_label(counts.messages),
            notifications_label: badge_label(counts.notifications),
        }
    }
}

pub struct BadgeService {
    messages: Arc<MessageService>,
    notifications: Arc<NotificationService>,
}

impl BadgeService {
    pub fn new(messages: Arc<MessageService>, notifications: Arc<NotificationService>) -> Self {
        Self {
            messages,
            notifications,
        }
    }

    pub async fn counts(&self, user_id: i64) -> Result<BadgeCounts, BadgeServiceError> {
        let messages = self.messages.unread_count(user_id).await?;
        let notifications = self.notifications.unread_count(user_id).await?;
        Ok(BadgeCounts {
            messages,
            notifications,
        })
    }
}
