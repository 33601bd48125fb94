//! Direct message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of the inbox: the other participant and the latest exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub partner: ProfileSummary,
    pub last_message: Message,
    /// Messages from the partner not yet read
    pub unread_count: i64,
}
