//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, users};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signup       -> signup
/// POST /login        -> login
/// POST /logout       -> logout (requires auth)
/// POST /update-user  -> update_user (admin)
/// GET  /users        -> list_users (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/update-user", post(users::update_user))
        .route("/users", get(users::list_users))
}
