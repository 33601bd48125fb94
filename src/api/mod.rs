//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api/v1`. Public routes resolve the session
//! when one is presented; protected routes reject anonymous callers.

pub mod articles;
pub mod auth;
pub mod bookmarks;
pub mod comments;
pub mod common;
pub mod communities;
pub mod drafts;
pub mod feed;
pub mod follows;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod profiles;
pub mod realtime;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, RequestStats};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need auth)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/profiles", profiles::protected_router())
        .nest(
            "/articles",
            articles::protected_router().merge(comments::protected_article_router()),
        )
        .nest("/comments", comments::protected_router())
        .nest("/feed", feed::protected_router())
        .nest("/drafts", drafts::protected_router())
        .nest("/messages", messages::protected_router())
        .nest("/notifications", notifications::protected_router())
        .nest("/follows", follows::protected_router())
        .nest("/bookmarks", bookmarks::protected_router())
        .nest("/communities", communities::protected_router())
        .merge(realtime::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/profiles", profiles::public_router())
        .nest(
            "/articles",
            articles::public_router().merge(comments::public_article_router()),
        )
        .nest("/categories", articles::categories_router())
        .nest("/feed", feed::public_router())
        .nest("/communities", communities::public_router())
        .merge(realtime::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
        .nest("/health", health::router())
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
