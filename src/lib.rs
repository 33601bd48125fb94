//! LostLibrary - a social publishing backend
//!
//! Articles with likes, comments and drafts, personalised feeds, direct
//! messages, notifications, follows, bookmarks and communities, plus a
//! realtime channel that keeps unread badges current.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod realtime;
pub mod services;
