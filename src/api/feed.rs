//! Feed API endpoints
//!
//! - GET /api/v1/feed?category=&page=&per_page= - "For you" feed
//! - GET /api/v1/feed/following?page= - Articles by followed authors (protected)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, PageQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PaginatedResponse;
use crate::models::{ArticleWithAuthor, FeedPage};

/// `per_page` falls back to the configured feed page size
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(for_you))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/following", get(following))
}

/// GET /api/v1/feed
async fn for_you(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<PaginatedResponse<ArticleWithAuthor>>, ApiError> {
    let per_page = query.per_page.unwrap_or(state.config.feed.page_size);
    let result = state
        .feed_service
        .for_you(query.category.as_deref(), query.page, per_page)
        .await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/feed/following
async fn following(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedPage>, ApiError> {
    Ok(Json(state.feed_service.following(user.id(), query.page).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{publish, register, test_server};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_unknown_category_is_empty_not_error() {
        let (server, _state) = test_server().await;
        let (token, _) = register(&server, "bede").await;
        publish(&server, &token, "Ecclesiastical History").await;

        let all: Value = server.get("/api/v1/feed").add_query_param("category", "all").await.json();
        assert_eq!(all["total"], 1);

        let response = server
            .get("/api/v1/feed")
            .add_query_param("category", "alchemy")
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 0);
        assert_eq!(body["has_more"], false);
    }

    #[tokio::test]
    async fn test_pagination_reports_has_more() {
        let (server, _state) = test_server().await;
        let (token, _) = register(&server, "bede").await;
        for i in 0..3 {
            publish(&server, &token, &format!("Chapter {}", i)).await;
        }

        let first: Value = server
            .get("/api/v1/feed")
            .add_query_param("per_page", 2)
            .await
            .json();
        assert_eq!(first["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(first["has_more"], true);

        let second: Value = server
            .get("/api/v1/feed")
            .add_query_param("per_page", 2)
            .add_query_param("page", 2)
            .await
            .json();
        assert_eq!(second["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(second["has_more"], false);
    }

    #[tokio::test]
    async fn test_following_feed() {
        let (server, _state) = test_server().await;
        let (reader, _) = register(&server, "reader").await;
        let (author, author_id) = register(&server, "bede").await;
        publish(&server, &author, "Ecclesiastical History").await;

        server
            .get("/api/v1/feed/following")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let empty: Value = server
            .get("/api/v1/feed/following")
            .authorization_bearer(&reader)
            .await
            .json();
        assert_eq!(empty["articles"].as_array().map(Vec::len), Some(0));

        server
            .post(&format!("/api/v1/follows/{}", author_id))
            .authorization_bearer(&reader)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let feed: Value = server
            .get("/api/v1/feed/following")
            .authorization_bearer(&reader)
            .await
            .json();
        assert_eq!(feed["articles"][0]["author"]["username"], "bede");
        assert_eq!(feed["has_more"], false);
    }
}
