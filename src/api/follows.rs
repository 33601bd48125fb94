//! Follow API endpoints (all protected)
//!
//! - GET /api/v1/follows/{user_id} - Whether the caller follows the user
//! - POST /api/v1/follows/{user_id} - Follow (idempotent)
//! - DELETE /api/v1/follows/{user_id} - Unfollow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

#[derive(Debug, Serialize)]
pub struct FollowStatus {
    pub following: bool,
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route(
        "/{user_id}",
        get(follow_status).post(follow).delete(unfollow),
    )
}

async fn follow_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<FollowStatus>, ApiError> {
    let following = state.follow_service.is_following(user.id(), user_id).await?;
    Ok(Json(FollowStatus { following }))
}

async fn follow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.follow_service.follow(user.id(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unfollow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.follow_service.unfollow(user.id(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
