//! Direct message API endpoints (all protected)
//!
//! - GET /api/v1/messages - Conversation list
//! - POST /api/v1/messages - Send a message
//! - GET /api/v1/messages/with/{user_id} - Conversation with one user; marks
//!   their messages read
//! - POST /api/v1/messages/read-all
//! - GET /api/v1/messages/unread-count

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CountResponse;
use crate::models::{ConversationSummary, Message};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations).post(send_message))
        .route("/with/{user_id}", get(get_conversation))
        .route("/read-all", post(mark_all_read))
        .route("/unread-count", get(unread_count))
}

async fn list_conversations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.message_service.conversations(user.id()).await?))
}

/// POST /api/v1/messages
async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .message_service
        .send(user.id(), body.recipient_id, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages/with/{user_id}
async fn get_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(other_id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .message_service
        .conversation(user.id(), other_id, &query.params())
        .await?;
    state
        .message_service
        .mark_conversation_read(user.id(), other_id)
        .await?;
    Ok(Json(messages))
}

async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MarkedReadResponse>, ApiError> {
    let updated = state.message_service.mark_all_read(user.id()).await?;
    Ok(Json(MarkedReadResponse { updated }))
}

async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.message_service.unread_count(user.id()).await?;
    Ok(Json(CountResponse { count }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{register, test_server};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_send_read_and_unread_counts() {
        let (server, _state) = test_server().await;
        let (pliny, pliny_id) = register(&server, "pliny").await;
        let (trajan, trajan_id) = register(&server, "trajan").await;

        let sent = server
            .post("/api/v1/messages")
            .authorization_bearer(&pliny)
            .json(&json!({ "recipient_id": trajan_id, "content": "About the Christians..." }))
            .await;
        sent.assert_status(StatusCode::CREATED);

        let unread: Value = server
            .get("/api/v1/messages/unread-count")
            .authorization_bearer(&trajan)
            .await
            .json();
        assert_eq!(unread["count"], 1);

        let inbox: Value = server
            .get("/api/v1/messages")
            .authorization_bearer(&trajan)
            .await
            .json();
        assert_eq!(inbox[0]["partner"]["username"], "pliny");
        assert_eq!(inbox[0]["unread_count"], 1);

        let thread: Value = server
            .get(&format!("/api/v1/messages/with/{}", pliny_id))
            .authorization_bearer(&trajan)
            .await
            .json();
        assert_eq!(thread[0]["content"], "About the Christians...");

        let unread: Value = server
            .get("/api/v1/messages/unread-count")
            .authorization_bearer(&trajan)
            .await
            .json();
        assert_eq!(unread["count"], 0);
    }

    #[tokio::test]
    async fn test_send_rejections() {
        let (server, _state) = test_server().await;
        let (pliny, pliny_id) = register(&server, "pliny").await;

        server
            .post("/api/v1/messages")
            .authorization_bearer(&pliny)
            .json(&json!({ "recipient_id": pliny_id, "content": "Note to self" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/messages")
            .authorization_bearer(&pliny)
            .json(&json!({ "recipient_id": 4242, "content": "Anyone?" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .get("/api/v1/messages")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
