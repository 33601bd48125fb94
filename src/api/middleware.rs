//! API middleware
//!
//! Contains:
//! - Application state and service wiring
//! - Authentication (session token from bearer header or cookie)
//! - The JSON error envelope and service error mapping
//! - Request statistics

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    CommentScope, SqlxArticleRepository, SqlxBookmarkRepository, SqlxCommentRepository,
    SqlxCommunityRepository, SqlxDraftRepository, SqlxFollowRepository, SqlxLikeRepository,
    SqlxMessageRepository, SqlxNotificationRepository, SqlxProfileRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::realtime::EventBus;
use crate::services::{
    ArticleService, ArticleServiceError, BadgeService, BadgeServiceError, BookmarkService,
    BookmarkServiceError, CommentService, CommentServiceError, CommunityService,
    CommunityServiceError, DraftService, DraftServiceError, FeedService, FeedServiceError,
    FollowService, FollowServiceError, MessageService, MessageServiceError, NotificationService,
    NotificationServiceError, ProfileService, ProfileServiceError, UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub events: EventBus,
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub article_service: Arc<ArticleService>,
    pub feed_service: Arc<FeedService>,
    pub comment_service: Arc<CommentService>,
    pub draft_service: Arc<DraftService>,
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub follow_service: Arc<FollowService>,
    pub bookmark_service: Arc<BookmarkService>,
    pub community_service: Arc<CommunityService>,
    pub badge_service: Arc<BadgeService>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, config: Config, events: EventBus) -> Self {
        let cache = create_cache(&config.cache);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let profile_repo = SqlxProfileRepository::boxed(pool.clone());
        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let bookmark_repo = SqlxBookmarkRepository::boxed(pool.clone());
        let community_repo = SqlxCommunityRepository::boxed(pool.clone());

        let user_service = Arc::new(
            UserService::new(
                user_repo.clone(),
                SqlxSessionRepository::boxed(pool.clone()),
                profile_repo.clone(),
            )
            .with_session_expiration(config.auth.session_days),
        );
        let profile_service = Arc::new(ProfileService::new(profile_repo, cache));
        let notification_service = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
            events.clone(),
        ));
        let article_service = Arc::new(ArticleService::new(
            article_repo.clone(),
            SqlxLikeRepository::boxed(pool.clone()),
            bookmark_repo.clone(),
            notification_service.clone(),
        ));
        let follow_repo = SqlxFollowRepository::boxed(pool.clone());
        let feed_service = Arc::new(
            FeedService::new(article_repo.clone(), follow_repo.clone())
                .with_following_page_size(config.feed.following_page_size),
        );
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone(), CommentScope::Article),
            article_repo.clone(),
            notification_service.clone(),
        ));
        let draft_service = Arc::new(DraftService::new(
            SqlxDraftRepository::boxed(pool.clone()),
            article_service.clone(),
        ));
        let message_service = Arc::new(MessageService::new(
            SqlxMessageRepository::boxed(pool.clone()),
            user_repo.clone(),
            profile_service.clone(),
            events.clone(),
        ));
        let follow_service = Arc::new(FollowService::new(
            follow_repo,
            user_repo,
            notification_service.clone(),
        ));
        let bookmark_service = Arc::new(BookmarkService::new(
            bookmark_repo,
            article_repo,
            community_repo.clone(),
        ));
        let community_service = Arc::new(CommunityService::new(
            community_repo,
            SqlxCommentRepository::boxed(pool.clone(), CommentScope::CommunityPost),
        ));
        let badge_service = Arc::new(BadgeService::new(
            message_service.clone(),
            notification_service.clone(),
        ));

        Self {
            pool,
            config: Arc::new(config),
            events,
            user_service,
            profile_service,
            article_service,
            feed_service,
            comment_service,
            draft_service,
            message_service,
            notification_service,
            follow_service,
            bookmark_service,
            community_service,
            badge_service,
            request_stats: Arc::new(RequestStats::new()),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

/// Session token from the `Authorization: Bearer` header, else the
/// `session` cookie
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("session="))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token_from_headers(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware; anonymous requests pass through
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token_from_headers(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Request statistics middleware
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMIT", message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::RateLimited => ApiError::with_details(
                "RATE_LIMIT",
                e.to_string(),
                serde_json::json!({ "retry_after": 900 }),
            ),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(e: ProfileServiceError) -> Self {
        match e {
            ProfileServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::Conflict(_) => ApiError::conflict(e.to_string()),
            ProfileServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ArticleServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<FeedServiceError> for ApiError {
    fn from(e: FeedServiceError) -> Self {
        match e {
            FeedServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            CommentServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<DraftServiceError> for ApiError {
    fn from(e: DraftServiceError) -> Self {
        match e {
            DraftServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            DraftServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            DraftServiceError::Conflict(_) => ApiError::conflict(e.to_string()),
            DraftServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<MessageServiceError> for ApiError {
    fn from(e: MessageServiceError) -> Self {
        match e {
            MessageServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            MessageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            MessageServiceError::RateLimited => ApiError::with_details(
                "RATE_LIMIT",
                e.to_string(),
                serde_json::json!({ "retry_after": 60 }),
            ),
            MessageServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<NotificationServiceError> for ApiError {
    fn from(e: NotificationServiceError) -> Self {
        match e {
            NotificationServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            NotificationServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<FollowServiceError> for ApiError {
    fn from(e: FollowServiceError) -> Self {
        match e {
            FollowServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            FollowServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            FollowServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<BookmarkServiceError> for ApiError {
    fn from(e: BookmarkServiceError) -> Self {
        match e {
            BookmarkServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            BookmarkServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CommunityServiceError> for ApiError {
    fn from(e: CommunityServiceError) -> Self {
        match e {
            CommunityServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CommunityServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommunityServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            CommunityServiceError::Conflict(_) => ApiError::conflict(e.to_string()),
            CommunityServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<BadgeServiceError> for ApiError {
    fn from(e: BadgeServiceError) -> Self {
        match e {
            BadgeServiceError::Messages(e) => e.into(),
            BadgeServiceError::Notifications(e) => e.into(),
        }
    }
}
