//! User model
//!
//! A user is the authentication identity. Public-facing fields live on the
//! matching `Profile` row, which shares the user's id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user. The password must already be hashed.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Local part of the email address, used as a fallback handle
    pub fn email_local_part(&self) -> Option<&str> {
        self.email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
    }
}
