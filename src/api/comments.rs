//! Comment API endpoints
//!
//! - GET /api/v1/articles/id/{id}/comments - Comment tree
//! - POST /api/v1/articles/id/{id}/comments - Comment or reply (protected)
//! - DELETE /api/v1/comments/{id} - Delete own comment (protected)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::CommentNode;

/// Request body for creating a comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentNode>,
    pub total: i64,
}

pub fn public_article_router() -> Router<AppState> {
    Router::new().route("/id/{id}/comments", get(list_comments))
}

pub fn protected_article_router() -> Router<AppState> {
    Router::new().route("/id/{id}/comments", post(create_comment))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(delete_comment))
}

/// GET /api/v1/articles/id/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let comments = state.comment_service.list_for_article(article_id).await?;
    let total = state.comment_service.count_for_article(article_id).await?;
    Ok(Json(CommentListResponse { comments, total }))
}

/// POST /api/v1/articles/id/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(article_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(user.id(), article_id, &body.content, body.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/v1/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{publish, register, test_server};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    async fn article_id(server: &axum_test::TestServer, slug: &str) -> i64 {
        let page: Value = server.get(&format!("/api/v1/articles/{}", slug)).await.json();
        page["article"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_comment_and_reply_tree() {
        let (server, _state) = test_server().await;
        let (author, _) = register(&server, "procopius").await;
        let (reader, _) = register(&server, "reader").await;
        let slug = publish(&server, &author, "Secret History").await;
        let id = article_id(&server, &slug).await;
        let path = format!("/api/v1/articles/id/{}/comments", id);

        let created = server
            .post(&path)
            .authorization_bearer(&reader)
            .json(&json!({ "content": "  Scandalous.  " }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let root: Value = created.json();
        assert_eq!(root["content"], "Scandalous.");

        server
            .post(&path)
            .authorization_bearer(&author)
            .json(&json!({ "content": "Entirely true.", "parent_id": root["id"] }))
            .await
            .assert_status(StatusCode::CREATED);

        let listing: Value = server.get(&path).await.json();
        assert_eq!(listing["total"], 2);
        assert_eq!(listing["comments"].as_array().map(Vec::len), Some(1));
        assert_eq!(listing["comments"][0]["replies"][0]["content"], "Entirely true.");
    }

    #[tokio::test]
    async fn test_comment_validation_and_ownership() {
        let (server, _state) = test_server().await;
        let (author, _) = register(&server, "procopius").await;
        let (reader, _) = register(&server, "reader").await;
        let slug = publish(&server, &author, "Secret History").await;
        let id = article_id(&server, &slug).await;
        let path = format!("/api/v1/articles/id/{}/comments", id);

        server
            .post(&path)
            .authorization_bearer(&reader)
            .json(&json!({ "content": "   " }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/articles/id/9999/comments")
            .authorization_bearer(&reader)
            .json(&json!({ "content": "Hello" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let comment: Value = server
            .post(&path)
            .authorization_bearer(&reader)
            .json(&json!({ "content": "Mine" }))
            .await
            .json();
        let delete_path = format!("/api/v1/comments/{}", comment["id"]);

        server
            .delete(&delete_path)
            .authorization_bearer(&author)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&delete_path)
            .authorization_bearer(&reader)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }
}
