//! User session model and DTOs.

use sqlx::FromRow;
use onboard_core::types::{DbId, Timestamp};

/// A session row from the `user_sessions` table.
///
/// `token_id` is the `jti` claim of the access token the session backs.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub token_id: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new user session.
pub struct CreateSession {
    pub user_id: DbId,
    pub token_id: String,
    pub expires_at: Timestamp,
}
