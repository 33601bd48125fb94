//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Register and start a session
//! - POST /api/v1/auth/login - Log in with email or username
//! - POST /api/v1/auth/logout - End the current session
//! - GET /api/v1/auth/me - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{session_token_from_headers, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::{Session, User};
use crate::services::user::{LoginInput, RegisterInput};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// `Set-Cookie` header carrying the session token
fn session_cookie(session: &Session, days: i64) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        days * 24 * 60 * 60
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );
    Ok(headers)
}

async fn auth_response(
    state: &AppState,
    user: User,
    session: Session,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let headers = session_cookie(&session, state.config.auth.session_days)?;
    let profile = state.profile_service.summary(user.id).await?;
    Ok((
        headers,
        Json(AuthResponse {
            user: UserResponse::new(user, profile),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body).await?;

    let (user, session) = state
        .user_service
        .login(LoginInput {
            email_or_username: user.email.clone(),
            password,
        })
        .await?;

    let (headers, body) = auth_response(&state, user, session).await?;
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(body).await?;
    auth_response(&state, user, session).await
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token_from_headers(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let profile = state.profile_service.summary(user.id()).await?;
    Ok(Json(UserResponse::new(user.0, profile)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{register, test_server};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_register_login_me_logout() {
        let (server, _state) = test_server().await;
        let (token, id) = register(&server, "livy").await;

        let me = server.get("/api/v1/auth/me").authorization_bearer(&token).await;
        me.assert_status_ok();
        let body: Value = me.json();
        assert_eq!(body["id"], id);
        assert_eq!(body["profile"]["username"], "livy");

        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "livy@example.com", "password": "ab urbe condita" }))
            .await;
        login.assert_status_ok();
        let fresh: Value = login.json();
        assert!(fresh["token"].as_str().is_some());

        server
            .post("/api/v1/auth/logout")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get("/api/v1/auth/me")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_credentials_and_duplicates() {
        let (server, _state) = test_server().await;
        register(&server, "livy").await;

        let wrong = server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "livy", "password": "nope" }))
            .await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);

        let duplicate = server
            .post("/api/v1/auth/register")
            .json(&json!({ "email": "livy@example.com", "password": "x" }))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);
        let body: Value = duplicate.json();
        assert_eq!(body["error"]["code"], "CONFLICT");
    }
}
