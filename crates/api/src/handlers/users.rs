//! Admin-only user management handlers.

use axum::extract::State;
use axum::Json;
use onboard_core::error::CoreError;
use onboard_core::roles::{is_valid_role, ALL_ROLES};
use onboard_db::models::user::{UpdateUser, UserResponse};
use onboard_db::repositories::UserRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/update-user`.
///
/// Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub role: Option<String>,
    pub skills: Option<Vec<String>>,
}

/// POST /api/auth/update-user
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(input): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if let Some(role) = input.role.as_deref() {
        if !is_valid_role(role) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "role: must be one of {}",
                ALL_ROLES.join(", ")
            ))));
        }
    }

    let changes = UpdateUser {
        role: input.role,
        skills: input.skills,
    };
    let user = UserRepo::update_by_email(&state.pool, &input.email, &changes)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "user",
            key: input.email.clone(),
        })?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id = user.id,
        role = %user.role,
        "User updated"
    );

    Ok(Json(DataResponse { data: user.into() }))
}

/// GET /api/auth/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(DataResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
    }))
}
