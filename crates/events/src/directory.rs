//! User lookup seam for event handlers.
//!
//! Handlers depend on [`UserDirectory`] rather than on the database so the
//! signup workflow can be exercised without Postgres. [`PgUserDirectory`]
//! is the production implementation.

use async_trait::async_trait;
use onboard_db::models::user::User;
use onboard_db::repositories::UserRepo;
use onboard_db::DbPool;

/// Error type for directory lookups.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The backing database query failed.
    #[error("Directory query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// The directory could not be reached for another reason.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Read access to user records by email.
///
/// Must be safe to call concurrently with account writes elsewhere; a user
/// whose insert has committed must be visible to later lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns `Ok(None)` when no user has this email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;
}

/// [`UserDirectory`] backed by the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }
}
