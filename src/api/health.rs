//! Health and runtime statistics
//!
//! - GET /api/v1/health

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;
use crate::db::migrations;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    /// Every embedded migration has been applied
    pub schema_up_to_date: bool,
    pub migrations: usize,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    /// Open realtime sockets
    pub realtime_subscribers: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// Reports 503 when the database does not answer
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match state.pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Health check database ping failed: {:#}", e);
            false
        }
    };
    let schema_up_to_date = database
        && match migrations::is_up_to_date(&state.pool).await {
            Ok(up_to_date) => up_to_date,
            Err(e) => {
                tracing::error!("Health check migration status failed: {:#}", e);
                false
            }
        };
    let uptime_seconds = state.request_stats.uptime_seconds();

    let response = HealthResponse {
        status: if database { "ok" } else { "degraded" },
        version: APP_VERSION,
        database,
        schema_up_to_date,
        migrations: migrations::total_migrations(),
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        total_requests: state.request_stats.total_requests(),
        avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
        realtime_subscribers: state.events.subscriber_count(),
    };
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Format uptime as a short human readable string
fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_server;
    use serde_json::Value;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(125), "2m");
        assert_eq!(format_uptime(3 * 3600 + 60), "3h 1m");
        assert_eq!(format_uptime(2 * 86400 + 3600), "2d 1h 0m");
    }

    #[tokio::test]
    async fn test_health_reports_database() {
        let (server, _state) = test_server().await;
        server.get("/api/v1/categories").await;

        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
        assert_eq!(body["schema_up_to_date"], true);
        assert_eq!(body["migrations"], 12);
        assert!(body["total_requests"].as_u64().unwrap_or(0) >= 1);
    }
}
