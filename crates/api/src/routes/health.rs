//! `GET /health`: database reachability plus whether signups will trigger
//! a welcome email on this instance.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use onboard_core::event_types::EVENT_USER_SIGNUP;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when the database answers, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// False when SMTP is unconfigured and no signup handler is registered.
    pub welcome_email: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match onboard_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        welcome_email: state.event_bus.handler_count(EVENT_USER_SIGNUP) > 0,
    })
}

/// Mounted at the root, outside `/api/auth`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
