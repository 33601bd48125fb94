//! Community API endpoints
//!
//! Public:
//! - GET /api/v1/communities?category=&page=&per_page=
//! - GET /api/v1/communities/{id}
//! - GET /api/v1/communities/{id}/members
//! - GET /api/v1/communities/{id}/posts
//! - GET /api/v1/communities/posts/{post_id}/comments
//!
//! Protected:
//! - POST /api/v1/communities
//! - POST /api/v1/communities/{id}/join
//! - POST /api/v1/communities/{id}/leave
//! - POST /api/v1/communities/{id}/posts
//! - POST /api/v1/communities/posts/{post_id}/comments

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{CategoryQuery, PaginationQuery};
use crate::api::comments::CreateCommentRequest;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::PaginatedResponse;
use crate::models::{
    CommentNode, CommunityMember, CommunityPostWithMeta, CommunityWithStats, CreateCommunityInput,
};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

/// Community page payload
#[derive(Debug, Serialize)]
pub struct CommunityDetail {
    #[serde(flatten)]
    pub community: CommunityWithStats,
    pub is_member: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_communities))
        .route("/{id}", get(get_community))
        .route("/{id}/members", get(list_members))
        .route("/{id}/posts", get(list_posts))
        .route("/posts/{post_id}/comments", get(list_post_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_community))
        .route("/{id}/join", post(join_community))
        .route("/{id}/leave", post(leave_community))
        .route("/{id}/posts", post(create_post))
        .route("/posts/{post_id}/comments", post(comment_on_post))
}

async fn list_communities(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<PaginatedResponse<CommunityWithStats>>, ApiError> {
    let result = state
        .community_service
        .list(query.category.as_deref(), &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn get_community(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<CommunityDetail>, ApiError> {
    let community = state.community_service.get(id).await?;
    let is_member = match viewer {
        Some(viewer) => state.community_service.is_member(viewer.id(), id).await?,
        None => false,
    };
    Ok(Json(CommunityDetail {
        community,
        is_member,
    }))
}

async fn create_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommunityInput>,
) -> Result<impl IntoResponse, ApiError> {
    let community = state.community_service.create(user.id(), body).await?;
    Ok((StatusCode::CREATED, Json(community)))
}

async fn join_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.community_service.join(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.community_service.leave(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommunityMember>>, ApiError> {
    Ok(Json(state.community_service.members(id).await?))
}

async fn list_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<CommunityPostWithMeta>>, ApiError> {
    let result = state
        .community_service
        .posts(id, &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .community_service
        .create_post(user.id(), id, &body.title, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentNode>>, ApiError> {
    Ok(Json(state.community_service.post_comments(post_id).await?))
}

async fn comment_on_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .community_service
        .comment_on_post(user.id(), post_id, &body.content, body.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{register, test_server};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_membership_gates_posting() {
        let (server, _state) = test_server().await;
        let (founder, _) = register(&server, "founder").await;
        let (visitor, _) = register(&server, "visitor").await;

        let created = server
            .post("/api/v1/communities")
            .authorization_bearer(&founder)
            .json(&json!({ "name": "Byzantinists", "description": "Everything after 330" }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let community: Value = created.json();
        let base = format!("/api/v1/communities/{}", community["id"]);

        let post_body = json!({ "title": "Justinian", "content": "Discuss." });
        server
            .post(&format!("{}/posts", base))
            .authorization_bearer(&visitor)
            .json(&post_body)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .post(&format!("{}/join", base))
            .authorization_bearer(&visitor)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let detail: Value = server.get(&base).authorization_bearer(&visitor).await.json();
        assert_eq!(detail["is_member"], true);
        assert_eq!(detail["member_count"], 2);

        let post: Value = server
            .post(&format!("{}/posts", base))
            .authorization_bearer(&visitor)
            .json(&post_body)
            .await
            .json();
        let comments_path = format!("/api/v1/communities/posts/{}/comments", post["id"]);

        server
            .post(&comments_path)
            .authorization_bearer(&founder)
            .json(&json!({ "content": "Welcome." }))
            .await
            .assert_status(StatusCode::CREATED);

        let posts: Value = server.get(&format!("{}/posts", base)).await.json();
        assert_eq!(posts["total"], 1);
        assert_eq!(posts["items"][0]["comment_count"], 1);

        let thread: Value = server.get(&comments_path).await.json();
        assert_eq!(thread[0]["content"], "Welcome.");
    }

    #[tokio::test]
    async fn test_creator_cannot_leave_and_names_are_unique() {
        let (server, _state) = test_server().await;
        let (founder, _) = register(&server, "founder").await;
        let body = json!({ "name": "Byzantinists", "description": "" });

        let community: Value = server
            .post("/api/v1/communities")
            .authorization_bearer(&founder)
            .json(&body)
            .await
            .json();

        server
            .post("/api/v1/communities")
            .authorization_bearer(&founder)
            .json(&body)
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post(&format!("/api/v1/communities/{}/leave", community["id"]))
            .authorization_bearer(&founder)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let listing: Value = server.get("/api/v1/communities").await.json();
        assert_eq!(listing["total"], 1);
    }
}
