//! Notification API endpoints (all protected)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::messages::MarkedReadResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CountResponse;
use crate::models::NotificationWithActor;

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/{id}/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<NotificationWithActor>>, ApiError> {
    Ok(Json(
        state
            .notification_service
            .list(user.id(), &query.params())
            .await?,
    ))
}

async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.notification_service.unread_count(user.id()).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notification_service.mark_read(user.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MarkedReadResponse>, ApiError> {
    let updated = state.notification_service.mark_all_read(user.id()).await?;
    Ok(Json(MarkedReadResponse { updated }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{publish, register, test_server};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_like_notifies_author_and_mark_read() {
        let (server, _state) = test_server().await;
        let (author, _) = register(&server, "suetonius").await;
        let (reader, _) = register(&server, "reader").await;
        let slug = publish(&server, &author, "The Twelve Caesars").await;

        server
            .post(&format!("/api/v1/articles/{}/like", slug))
            .authorization_bearer(&reader)
            .await
            .assert_status_ok();

        let listing: Value = server
            .get("/api/v1/notifications")
            .authorization_bearer(&author)
            .await
            .json();
        assert_eq!(listing[0]["action_type"], "like");
        assert_eq!(listing[0]["actor"]["username"], "reader");
        assert_eq!(listing[0]["article_slug"], "the-twelve-caesars");

        let id = listing[0]["id"].as_i64().unwrap();

        // Another user's notification reads as missing
        server
            .post(&format!("/api/v1/notifications/{}/read", id))
            .authorization_bearer(&reader)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post(&format!("/api/v1/notifications/{}/read", id))
            .authorization_bearer(&author)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let unread: Value = server
            .get("/api/v1/notifications/unread-count")
            .authorization_bearer(&author)
            .await
            .json();
        assert_eq!(unread["count"], 0);
    }

    #[tokio::test]
    async fn test_own_like_does_not_notify() {
        let (server, _state) = test_server().await;
        let (author, _) = register(&server, "suetonius").await;
        let slug = publish(&server, &author, "The Twelve Caesars").await;

        server
            .post(&format!("/api/v1/articles/{}/like", slug))
            .authorization_bearer(&author)
            .await
            .assert_status_ok();

        let unread: Value = server
            .get("/api/v1/notifications/unread-count")
            .authorization_bearer(&author)
            .await
            .json();
        assert_eq!(unread["count"], 0);

        let marked: Value = server
            .post("/api/v1/notifications/read-all")
            .authorization_bearer(&author)
            .await
            .json();
        assert_eq!(marked["updated"], 0);
    }
}
