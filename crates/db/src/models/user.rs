//! User entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use onboard_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub skills: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub role: String,
    pub skills: Vec<String>,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            skills: user.skills,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub skills: Vec<String>,
}

/// DTO for updating an existing user. `None` fields are left unchanged.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub role: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_omits_password_hash() {
        let now = chrono::Utc::now();
        let user = User {
            id: 9,
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "user".to_string(),
            skills: vec!["rust".to_string()],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserResponse::from(user)).expect("serializes");
        assert_eq!(json["id"], 9);
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["skills"][0], "rust");
        assert!(json.get("password_hash").is_none());
    }
}
