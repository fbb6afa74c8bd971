use std::sync::Arc;

use onboard_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted and everything else is
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: onboard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event bus that signup publishes to.
    pub event_bus: Arc<EventBus>,
}
