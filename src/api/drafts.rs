//! Draft API endpoints (all protected)
//!
//! - GET /api/v1/drafts
//! - POST /api/v1/drafts
//! - GET /api/v1/drafts/{id}
//! - PUT /api/v1/drafts/{id}
//! - DELETE /api/v1/drafts/{id}
//! - POST /api/v1/drafts/{id}/publish

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Draft, DraftInput};

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_drafts).post(create_draft))
        .route(
            "/{id}",
            get(get_draft).put(update_draft).delete(delete_draft),
        )
        .route("/{id}/publish", post(publish_draft))
}

async fn list_drafts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Draft>>, ApiError> {
    Ok(Json(state.draft_service.list(user.id()).await?))
}

async fn create_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<DraftInput>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = state.draft_service.create(user.id(), body).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

async fn get_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Draft>, ApiError> {
    Ok(Json(state.draft_service.get(user.id(), id).await?))
}

async fn update_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<DraftInput>,
) -> Result<Json<Draft>, ApiError> {
    Ok(Json(state.draft_service.update(user.id(), id, body).await?))
}

async fn delete_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.draft_service.delete(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/drafts/{id}/publish
async fn publish_draft(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.draft_service.publish(user.id(), id).await?;
    Ok((StatusCode::CREATED, Json(article)))
}
