//! Article API endpoints
//!
//! - GET /api/v1/articles/{slug} - Article page (counts a view)
//! - POST /api/v1/articles/{slug}/like - Toggle like; anonymous callers get
//!   a 401 carrying the sign-in redirect
//! - POST /api/v1/articles - Publish (protected)
//! - DELETE /api/v1/articles/id/{id} - Delete own article (protected)
//! - GET /api/v1/categories - Category catalogue

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ArticleDetail, LikeToggle, PublishArticleInput, ARTICLE_CATEGORIES};
use crate::services::sign_in_redirect;

/// Category entry
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub slug: &'static str,
    pub label: &'static str,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(get_article))
        .route("/{slug}/like", post(toggle_like))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(publish_article))
        .route("/id/{id}", delete(delete_article))
}

pub fn categories_router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

/// GET /api/v1/articles/{slug}
async fn get_article(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let detail = state
        .article_service
        .view_by_slug(&slug, viewer.map(|v| v.id()))
        .await?;
    Ok(Json(detail))
}

/// POST /api/v1/articles/{slug}/like
async fn toggle_like(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(slug): Path<String>,
) -> Result<Json<LikeToggle>, ApiError> {
    let user = user.ok_or_else(|| {
        ApiError::with_details(
            "UNAUTHORIZED",
            "Sign in to like articles",
            serde_json::json!({ "redirect": sign_in_redirect(&slug) }),
        )
    })?;
    let toggle = state.article_service.toggle_like(user.id(), &slug).await?;
    Ok(Json(toggle))
}

/// POST /api/v1/articles
async fn publish_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<PublishArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.publish(user.id(), body).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// DELETE /api/v1/articles/id/{id}
async fn delete_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/categories
async fn list_categories() -> Json<Vec<CategoryResponse>> {
    Json(
        ARTICLE_CATEGORIES
            .iter()
            .map(|&(slug, label)| CategoryResponse { slug, label })
            .collect(),
    )
}
