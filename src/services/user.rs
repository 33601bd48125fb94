//! User service
//!
//! Registration, login/logout and session management. Registering creates
//! both the user row and its (empty) profile; an optional username given at
//! sign-up is stored on the profile.

use crate::db::repositories::{ProfileRepository, SessionRepository, UserRepository};
use crate::models::{Profile, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::profile::validate_username;
use crate::services::rate_limiter::RateLimiter;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    /// Too many failed logins for this identifier
    #[error("Too many login attempts, try again later")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Login input
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Email address or profile username
    #[serde(alias = "email", alias = "username")]
    pub email_or_username: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    profile_repo: Arc<dyn ProfileRepository>,
    login_limiter: RateLimiter,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            profile_repo,
            login_limiter: RateLimiter::for_logins(),
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Use a custom session lifetime
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days.max(1);
        self
    }

    /// Register a new user and create their profile
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        let username = match input.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                validate_username(name).map_err(UserServiceError::ValidationError)?;
                if self
                    .profile_repo
                    .username_taken(name, None)
                    .await
                    .context("Failed to check username")?
                {
                    return Err(UserServiceError::UserExists(format!(
                        "Username '{}' is already taken",
                        name
                    )));
                }
                Some(name.to_string())
            }
            _ => None,
        };

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = self
            .user_repo
            .create(&User::new(email, password_hash))
            .await
            .context("Failed to create user")?;

        self.profile_repo
            .create(&Profile::empty(user.id, username))
            .await
            .context("Failed to create profile")?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Login with an email or username and password
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let identifier = input.email_or_username.trim();
        if self.login_limiter.is_limited(identifier).await {
            tracing::warn!(identifier, "Login rate limited");
            return Err(UserServiceError::RateLimited);
        }

        let user = match self.find_user(identifier).await? {
            Some(user) => user,
            None => {
                self.login_limiter.record(identifier).await;
                return Err(invalid_credentials());
            }
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            self.login_limiter.record(identifier).await;
            return Err(invalid_credentials());
        }

        self.login_limiter.clear(identifier).await;

        let session = self
            .session_repo
            .create(&Session::start(user.id, self.session_expiration_days))
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?)
    }

    /// Validate a session token and return the associated user.
    ///
    /// Expired sessions are deleted and treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        Ok(self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        self.login_limiter.cleanup().await;
        Ok(count)
    }

    async fn find_user(&self, identifier: &str) -> Result<Option<User>, UserServiceError> {
        let user = if identifier.contains('@') {
            self.user_repo
                .get_by_email(&identifier.to_lowercase())
                .await
                .context("Failed to get user by email")?
        } else {
            self.user_repo
                .get_by_username(identifier)
                .await
                .context("Failed to get user by username")?
        };
        Ok(user)
    }
}

fn invalid_credentials() -> UserServiceError {
    UserServiceError::AuthenticationError("Invalid email/username or password".to_string())
}
