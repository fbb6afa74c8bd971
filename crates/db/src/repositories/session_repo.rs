//! Repository for the `user_sessions` table.

use sqlx::PgPool;

use crate::models::session::{CreateSession, UserSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_id, expires_at, is_revoked, created_at";

/// Provides CRUD operations for user sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, token_id, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_id)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an active session by token id.
    ///
    /// Only returns sessions that are not revoked and not expired.
    pub async fn find_active(
        pool: &PgPool,
        token_id: &str,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE token_id = $1
               AND is_revoked = false
               AND expires_at > NOW()"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(token_id)
            .fetch_optional(pool)
            .await
    }

    /// Revoke the session backing a single token. Returns `true` if the row was updated.
    pub async fn revoke_by_token(pool: &PgPool, token_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE token_id = $1 AND is_revoked = false",
        )
        .bind(token_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
