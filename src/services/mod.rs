//! Services layer - Business logic
//!
//! This module contains the business logic of LostLibrary.
//! Services are responsible for:
//! - Implementing business rules and validation
//! - Coordinating repositories, the cache and the realtime bus
//! - Translating storage failures into their own error types

pub mod article;
pub mod badge;
pub mod bookmark;
pub mod comment;
pub mod community;
pub mod draft;
pub mod feed;
pub mod follow;
pub mod message;
pub mod notification;
pub mod password;
pub mod profile;
pub mod rate_limiter;
pub mod user;

pub use article::{
    generate_slug, make_excerpt, sign_in_redirect, ArticleService, ArticleServiceError,
};
pub use badge::{badge_label, BadgeCounts, BadgePayload, BadgeService, BadgeServiceError};
pub use bookmark::{BookmarkService, BookmarkServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use community::{CommunityService, CommunityServiceError};
pub use draft::{DraftService, DraftServiceError};
pub use feed::{FeedService, FeedServiceError};
pub use follow::{FollowService, FollowServiceError};
pub use message::{MessageService, MessageServiceError};
pub use notification::{NotificationService, NotificationServiceError};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileService, ProfileServiceError};
pub use rate_limiter::RateLimiter;
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
