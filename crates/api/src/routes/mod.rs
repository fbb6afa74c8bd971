pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /auth/signup         POST  public
/// /auth/login          POST  public
/// /auth/logout         POST  bearer
/// /auth/update-user    POST  admin
/// /auth/users          GET   admin
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
