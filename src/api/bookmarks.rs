//! Bookmark API endpoints (all protected)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::BookmarkEntry;

#[derive(Debug, Serialize)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookmarks))
        .route("/articles/{id}", post(toggle_article))
        .route("/posts/{id}", post(toggle_post))
}

async fn list_bookmarks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BookmarkEntry>>, ApiError> {
    Ok(Json(state.bookmark_service.list(user.id()).await?))
}

async fn toggle_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<BookmarkToggle>, ApiError> {
    let bookmarked = state.bookmark_service.toggle_article(user.id(), id).await?;
    Ok(Json(BookmarkToggle { bookmarked }))
}

async fn toggle_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<BookmarkToggle>, ApiError> {
    let bookmarked = state.bookmark_service.toggle_post(user.id(), id).await?;
    Ok(Json(BookmarkToggle { bookmarked }))
}
