//! Realtime badge endpoints
//!
//! - GET /api/v1/realtime?token= - WebSocket pushing unread badge counts
//! - GET /api/v1/badges - Current badge counts (protected)
//!
//! A socket receives the caller's counts on connect and again after every
//! message or notification change addressed to them. Bursts of events are
//! coalesced into a single refetch.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::api::middleware::{session_token_from_headers, ApiError, AppState, AuthenticatedUser};
use crate::realtime::RealtimeEvent;
use crate::services::BadgePayload;

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/realtime", get(realtime_socket))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/badges", get(get_badges))
}

/// GET /api/v1/badges
async fn get_badges(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<BadgePayload>, ApiError> {
    let counts = state.badge_service.counts(user.id()).await?;
    Ok(Json(counts.into()))
}

/// GET /api/v1/realtime
///
/// Browsers cannot set headers on a WebSocket handshake, so the session
/// token may also come from the `token` query parameter.
async fn realtime_socket(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| session_token_from_headers(&headers))
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    let user_id = user.id;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, user_id, socket)))
}

fn concerns(event: &RealtimeEvent, user_id: i64) -> bool {
    event.recipient_id == user_id
}

async fn handle_socket(state: AppState, user_id: i64, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();
    tracing::debug!(user_id, "Realtime socket connected");

    if send_badges(&state, user_id, &mut sender).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by the protocol layer; clients send nothing else
                    Some(Ok(_)) => {}
                }
            }
            recv = events.recv() => {
                let refetch = match recv {
                    Ok(event) => concerns(&event, user_id),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(user_id, skipped, "Realtime receiver lagged");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if !refetch {
                    continue;
                }

                // Drain whatever is already queued; one refetch covers it
                loop {
                    match events.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                    }
                }

                if send_badges(&state, user_id, &mut sender).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(user_id, "Realtime socket closed");
}

/// Push the current counts. Only a failed send is an error; a failed count
/// query is logged and skipped so the socket stays open.
async fn send_badges(
    state: &AppState,
    user_id: i64,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), axum::Error> {
    let payload: BadgePayload = match state.badge_service.counts(user_id).await {
        Ok(counts) => counts.into(),
        Err(e) => {
            tracing::warn!(user_id, "Failed to load badge counts: {}", e);
            return Ok(());
        }
    };
    let text = match serde_json::to_string(&payload) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Failed to encode badge payload: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}
