//! Profile API endpoints
//!
//! - GET /api/v1/profiles/{id}
//! - GET /api/v1/profiles/by-username/{username}
//! - GET /api/v1/profiles/{id}/articles
//! - GET /api/v1/profiles/{id}/followers
//! - GET /api/v1/profiles/{id}/following
//! - PUT /api/v1/profiles/me (protected)

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedResponse, ProfileResponse};
use crate::models::{ArticleWithAuthor, Profile, ProfileSummary, UpdateProfileInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_profile))
        .route("/by-username/{username}", get(get_profile_by_username))
        .route("/{id}/articles", get(list_profile_articles))
        .route("/{id}/followers", get(list_followers))
        .route("/{id}/following", get(list_following))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", put(update_my_profile))
}

async fn profile_response(state: &AppState, profile: Profile) -> Result<ProfileResponse, ApiError> {
    let stats = state.profile_service.stats(profile.id).await?;
    Ok(ProfileResponse::new(profile, stats))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.get(id).await?;
    Ok(Json(profile_response(&state, profile).await?))
}

async fn get_profile_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.get_by_username(&username).await?;
    Ok(Json(profile_response(&state, profile).await?))
}

async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.update(user.id(), body).await?;
    Ok(Json(profile_response(&state, profile).await?))
}

async fn list_profile_articles(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<ArticleWithAuthor>>, ApiError> {
    let result = state
        .article_service
        .list_by_author(id, &query.params())
        .await?;
    Ok(Json(result.into()))
}

async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError> {
    Ok(Json(state.follow_service.followers(id).await?))
}

async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError> {
    Ok(Json(state.follow_service.following(id).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{register, test_server};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_update_and_read_profile() {
        let (server, _state) = test_server().await;
        let (token, id) = register(&server, "tacitus").await;

        let updated = server
            .put("/api/v1/profiles/me")
            .authorization_bearer(&token)
            .json(&json!({ "full_name": "Publius Cornelius Tacitus", "twitter": "tacitus" }))
            .await;
        updated.assert_status_ok();

        let by_id: Value = server.get(&format!("/api/v1/profiles/{}", id)).await.json();
        assert_eq!(by_id["display_name"], "Publius Cornelius Tacitus");
        assert_eq!(by_id["handle"], "@tacitus");
        assert_eq!(by_id["stats"]["articles"], 0);

        let by_name = server.get("/api/v1/profiles/by-username/tacitus").await;
        by_name.assert_status_ok();

        server
            .get("/api/v1/profiles/by-username/nobody")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let invalid = server
            .put("/api/v1/profiles/me")
            .authorization_bearer(&token)
            .json(&json!({ "website": "not-a-url" }))
            .await;
        invalid.assert_status(StatusCode::BAD_REQUEST);
    }
}
