//! Repository tests against a real Postgres.
//!
//! Run with `DATABASE_URL` pointing at a scratch server and `--ignored`.

use chrono::Utc;
use onboard_db::models::session::CreateSession;
use onboard_db::models::user::{CreateUser, UpdateUser};
use onboard_db::repositories::{SessionRepo, UserRepo};
use sqlx::PgPool;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$placeholder".to_string(),
        role: "user".to_string(),
        skills: vec![],
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn create_then_find_by_email(pool: PgPool) {
    let created = UserRepo::create(&pool, &new_user("ada@example.com"))
        .await
        .unwrap();
    assert_eq!(created.role, "user");
    assert!(created.skills.is_empty());

    let found = UserRepo::find_by_email(&pool, "ada@example.com")
        .await
        .unwrap()
        .expect("user should exist");
    assert_eq!(found.id, created.id);

    let missing = UserRepo::find_by_email(&pool, "nobody@example.com")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn duplicate_email_violates_unique_constraint(pool: PgPool) {
    UserRepo::create(&pool, &new_user("dup@example.com"))
        .await
        .unwrap();
    let err = UserRepo::create(&pool, &new_user("dup@example.com"))
        .await
        .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_users_email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn update_by_email_applies_only_given_fields(pool: PgPool) {
    UserRepo::create(&pool, &new_user("mod@example.com"))
        .await
        .unwrap();

    let input = UpdateUser {
        role: Some("moderator".to_string()),
        skills: None,
    };
    let updated = UserRepo::update_by_email(&pool, "mod@example.com", &input)
        .await
        .unwrap()
        .expect("row should be updated");
    assert_eq!(updated.role, "moderator");
    assert!(updated.skills.is_empty());

    let none = UserRepo::update_by_email(&pool, "ghost@example.com", &input)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn revoked_session_is_no_longer_active(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("sess@example.com"))
        .await
        .unwrap();
    SessionRepo::create(
        &pool,
        &CreateSession {
            user_id: user.id,
            token_id: "jti-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        },
    )
    .await
    .unwrap();

    assert!(SessionRepo::find_active(&pool, "jti-1").await.unwrap().is_some());
    assert!(SessionRepo::revoke_by_token(&pool, "jti-1").await.unwrap());
    assert!(SessionRepo::find_active(&pool, "jti-1").await.unwrap().is_none());
    // Second revoke is a no-op.
    assert!(!SessionRepo::revoke_by_token(&pool, "jti-1").await.unwrap());
}
