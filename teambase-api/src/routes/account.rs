/// Account endpoints
///
/// Profile reads and updates, password changes, and account deletion for
/// the signed-in user. All handlers run behind the session middleware and
/// read the verified principal from request extensions.
///
/// # Endpoints
///
/// - `GET    /api/account` - Current user profile
/// - `PUT    /api/account` - Update name and email
/// - `PUT    /api/account/password` - Change password
/// - `DELETE /api/account` - Soft-delete the account

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::CurrentUser,
    routes::client_ip,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use teambase_shared::{
    auth::{
        cookie::build_clear_session_cookie,
        password::{hash_password, verify_password},
    },
    models::{
        activity_log::{ActivityAction, ActivityLog},
        team_member::TeamMember,
        user::User,
    },
};
use validator::Validate;

/// Account update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    /// Current password, re-verified before any change
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    /// New password
    #[validate(length(
        min = 8,
        max = 100,
        message = "Password must be between 8 and 100 characters"
    ))]
    pub new_password: String,

    /// Confirmation, must match the new password
    pub confirm_password: String,
}

/// Account deletion request
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    /// Password, re-verified before deletion
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returns the current user's profile
///
/// A session whose user row has since been soft-deleted is treated as
/// anonymous.
pub async fn get_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<User>> {
    let user = User::find_active_by_id(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session".to_string()))?;

    Ok(Json(user))
}

/// Updates the current user's name and email
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `409 Conflict`: email already in use by another account
pub async fn update_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = User::update_account(&state.db, current.user_id, &req.name, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session".to_string()))?;

    if let Some(membership) = TeamMember::find_first_by_user(&state.db, user.id).await? {
        ActivityLog::record(
            &state.db,
            membership.team_id,
            user.id,
            ActivityAction::UpdateAccount,
            client_ip(&headers).as_deref(),
        )
        .await?;
    }

    Ok(Json(user))
}

/// Changes the current user's password
///
/// The current password must verify, the confirmation must match, and the
/// new password must actually differ from the old one.
///
/// # Errors
///
/// - `400 Bad Request`: wrong current password, mismatched confirmation,
///   or unchanged password
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;

    if req.new_password != req.confirm_password {
        return Err(ApiError::BadRequest(
            "New password and confirmation do not match".to_string(),
        ));
    }

    let user = User::find_active_by_id(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session".to_string()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    if req.new_password == req.current_password {
        return Err(ApiError::BadRequest(
            "New password must be different from the current password".to_string(),
        ));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password_hash(&state.db, user.id, &password_hash).await?;

    if let Some(membership) = TeamMember::find_first_by_user(&state.db, user.id).await? {
        ActivityLog::record(
            &state.db,
            membership.team_id,
            user.id,
            ActivityAction::UpdatePassword,
            client_ip(&headers).as_deref(),
        )
        .await?;
    }

    Ok(Json(serde_json::json!({ "status": "password_updated" })))
}

/// Soft-deletes the current user's account
///
/// The password is re-verified first. Deletion stamps `deleted_at`,
/// renames the stored email to free it for future registrations, removes
/// the user's team memberships, and clears the session cookie. The audit
/// entry is written before the memberships go away so it can still be
/// attributed to a team.
///
/// # Errors
///
/// - `400 Bad Request`: wrong password
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<DeleteAccountRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let user = User::find_active_by_id(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::BadRequest(
            "Incorrect password. Account deletion failed".to_string(),
        ));
    }

    if let Some(membership) = TeamMember::find_first_by_user(&state.db, user.id).await? {
        ActivityLog::record(
            &state.db,
            membership.team_id,
            user.id,
            ActivityAction::DeleteAccount,
            client_ip(&headers).as_deref(),
        )
        .await?;
    }

    TeamMember::delete_by_user(&state.db, user.id).await?;
    User::soft_delete(&state.db, user.id).await?;

    let cookie = build_clear_session_cookie(state.is_production());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "account_deleted" })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_account_request_validation() {
        let req = UpdateAccountRequest {
            name: "".to_string(),
            email: "user@example.com".to_string(),
        };
        assert!(req.validate().is_err());

        let req = UpdateAccountRequest {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());

        let req = UpdateAccountRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_password_request_validation() {
        let req = UpdatePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "short".to_string(),
            confirm_password: "short".to_string(),
        };
        assert!(req.validate().is_err());

        let req = UpdatePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password-123".to_string(),
            confirm_password: "new-password-123".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
