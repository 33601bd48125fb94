//! Data models
//!
//! Database entities, the joined read models served by the API, and the
//! input types accepted by services.

mod article;
mod comment;
mod community;
mod draft;
mod message;
mod notification;
mod profile;
mod session;
mod social;
mod user;

pub use article::{
    is_known_category, Article, ArticleDetail, ArticleWithAuthor, FeedPage, LikeToggle,
    ListParams, NewArticle, PagedResult, PublishArticleInput, ARTICLE_CATEGORIES,
    DEFAULT_CATEGORY,
};
pub use comment::{build_comment_tree, Comment, CommentNode};
pub use community::{
    Community, CommunityMember, CommunityPost, CommunityPostWithMeta, CommunityWithStats,
    CreateCommunityInput,
};
pub use draft::{Draft, DraftInput};
pub use message::{ConversationSummary, Message};
pub use notification::{NewNotification, Notification, NotificationType, NotificationWithActor};
pub use profile::{Profile, ProfileStats, ProfileSummary, UpdateProfileInput};
pub use session::Session;
pub use social::{Bookmark, BookmarkEntry, BookmarkTarget, Follow};
pub use user::User;
