//! Handlers for the `/auth` resource (signup, login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use onboard_core::error::CoreError;
use onboard_core::roles::ROLE_USER;
use onboard_db::models::session::CreateSession;
use onboard_db::models::user::{CreateUser, User, UserResponse};
use onboard_db::repositories::{SessionRepo, UserRepo};
use onboard_events::{PlatformEvent, SignupEvent};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters long"))]
    pub password: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Successful authentication response returned by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/signup
///
/// Create an account, publish `user/signup`, then issue a token. The event
/// goes out as soon as the user row is committed, so a later token failure
/// still leaves the new account with its welcome email. The email itself
/// runs in the background; this response never waits for it.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AuthResponse>>)> {
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email,
            password_hash,
            role: ROLE_USER.to_string(),
            skills: input.skills,
        },
    )
    .await
    .map_err(|e| {
        if is_duplicate_email(&e) {
            AppError::Core(CoreError::Conflict("Email is already registered".into()))
        } else {
            AppError::Database(e)
        }
    })?;

    let event = PlatformEvent::from(SignupEvent::new(user.email.clone())).with_actor(user.id);
    let dispatch = state.event_bus.publish(event);
    tracing::info!(
        user_id = user.id,
        handlers = dispatch.handler_count(),
        "User signed up"
    );

    let response = create_auth_response(&state, user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// POST /api/auth/login
///
/// Authenticate with email + password.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        tracing::debug!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let response = create_auth_response(&state, user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/auth/logout
///
/// Revoke the session behind the presented token. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_by_token(&state.pool, &auth_user.token_id).await?;
    tracing::info!(user_id = auth_user.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_duplicate_email(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some("uq_users_email"))
}

/// Sign an access token, persist its session row, and build the response.
async fn create_auth_response(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let issued = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            token_id: issued.token_id,
            expires_at: issued.expires_at,
        },
    )
    .await?;

    Ok(AuthResponse {
        token: issued.token,
        user: user.into(),
    })
}
