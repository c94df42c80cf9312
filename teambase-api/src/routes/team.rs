/// Team endpoints
///
/// Team view, member invitations, member removal, and the activity feed.
/// Every handler resolves the acting user's team through the authoritative
/// first-membership lookup; the model is single-team.
///
/// # Endpoints
///
/// - `GET    /api/team` - Team with member roster
/// - `POST   /api/team/invitations` - Invite by email
/// - `DELETE /api/team/members/:id` - Remove a member
/// - `GET    /api/activity` - Recent activity for the acting user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::CurrentUser,
    routes::client_ip,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teambase_shared::models::{
    activity_log::{ActivityAction, ActivityLog},
    invitation::Invitation,
    team::Team,
    team_member::{TeamMember, TeamRole},
    user::User,
};
use validator::Validate;

/// Number of entries returned by the activity feed
const ACTIVITY_FEED_LIMIT: i64 = 10;

/// A team member with the user details the roster displays
#[derive(Debug, Serialize)]
pub struct TeamMemberView {
    /// Membership row ID (the handle used for removal)
    pub id: i64,

    /// The member's user ID
    pub user_id: i64,

    /// Role within the team
    pub role: TeamRole,

    /// When the user joined
    pub joined_at: DateTime<Utc>,

    /// Display name, when set
    pub name: Option<String>,

    /// Email address
    pub email: String,
}

/// Team response: the team row plus its member roster
#[derive(Debug, Serialize)]
pub struct TeamResponse {
    /// The team itself, including billing state
    #[serde(flatten)]
    pub team: Team,

    /// Current members
    pub members: Vec<TeamMemberView>,
}

/// Invitation request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    /// Email to invite
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role the invitee will get ("owner" or "member")
    pub role: String,
}

/// Returns the acting user's team with its member roster
///
/// The roster is assembled in two steps: membership rows first, then the
/// user record behind each row. Memberships are removed when an account is
/// deleted, so each row resolves to an active user.
pub async fn get_team(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<TeamResponse>> {
    let membership = TeamMember::find_first_by_user(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not part of a team".to_string()))?;

    let team = Team::find_by_id(&state.db, membership.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let rows = TeamMember::list_by_team(&state.db, team.id).await?;

    let mut members = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(user) = User::find_active_by_id(&state.db, row.user_id).await? {
            members.push(TeamMemberView {
                id: row.id,
                user_id: row.user_id,
                role: row.role,
                joined_at: row.joined_at,
                name: user.name,
                email: user.email,
            });
        }
    }

    Ok(Json(TeamResponse { team, members }))
}

/// Invites an email address to the acting user's team
///
/// Only owners can invite. An address that already belongs to a member, or
/// that already has a pending invitation, is rejected before a row is
/// written.
///
/// # Errors
///
/// - `404 Not Found`: inviter has no team
/// - `403 Forbidden`: inviter is not an owner
/// - `400 Bad Request`: invalid role, duplicate member, duplicate invite
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let role = TeamRole::parse(&req.role)
        .ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    let membership = TeamMember::find_first_by_user(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not part of a team".to_string()))?;

    if !membership.role.can_manage_team() {
        return Err(ApiError::Forbidden(
            "Only team owners can invite members".to_string(),
        ));
    }

    if let Some(existing) = User::find_active_by_email(&state.db, &req.email).await? {
        let roster = TeamMember::list_by_team(&state.db, membership.team_id).await?;
        if roster.iter().any(|m| m.user_id == existing.id) {
            return Err(ApiError::BadRequest(
                "User is already a member of this team".to_string(),
            ));
        }
    }

    if Invitation::pending_exists(&state.db, membership.team_id, &req.email).await? {
        return Err(ApiError::BadRequest(
            "An invitation has already been sent to this email".to_string(),
        ));
    }

    let invitation = Invitation::create(
        &state.db,
        membership.team_id,
        &req.email,
        role,
        current.user_id,
    )
    .await?;

    ActivityLog::record(
        &state.db,
        membership.team_id,
        current.user_id,
        ActivityAction::InviteTeamMember,
        client_ip(&headers).as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(invitation)).into_response())
}

/// Removes a member from the acting user's team
///
/// Only owners can remove. The membership row must belong to the owner's
/// own team; IDs from other teams read as not found.
///
/// # Errors
///
/// - `404 Not Found`: no team, or member not in this team
/// - `403 Forbidden`: actor is not an owner
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    Path(member_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let membership = TeamMember::find_first_by_user(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not part of a team".to_string()))?;

    if !membership.role.can_manage_team() {
        return Err(ApiError::Forbidden(
            "Only team owners can remove members".to_string(),
        ));
    }

    let target = TeamMember::find_by_id_in_team(&state.db, member_id, membership.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    TeamMember::delete(&state.db, target.id).await?;

    ActivityLog::record(
        &state.db,
        membership.team_id,
        current.user_id,
        ActivityAction::RemoveTeamMember,
        client_ip(&headers).as_deref(),
    )
    .await?;

    Ok(Json(serde_json::json!({ "status": "member_removed" })))
}

/// Lists the acting user's recent activity, newest first
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    let logs =
        ActivityLog::list_recent_for_user(&state.db, current.user_id, ACTIVITY_FEED_LIMIT).await?;

    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_request_validation() {
        let req = InviteMemberRequest {
            email: "not-an-email".to_string(),
            role: "member".to_string(),
        };
        assert!(req.validate().is_err());

        let req = InviteMemberRequest {
            email: "new@example.com".to_string(),
            role: "member".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_role_parsing_for_invites() {
        assert_eq!(TeamRole::parse("owner"), Some(TeamRole::Owner));
        assert_eq!(TeamRole::parse("member"), Some(TeamRole::Member));
        assert_eq!(TeamRole::parse("admin"), None);
    }
}
