/// Authentication endpoints
///
/// This module provides session-cookie authentication endpoints:
/// - Sign-up (with optional invitation acceptance)
/// - Sign-in (with optional checkout hand-off)
/// - Sign-out
///
/// # Endpoints
///
/// - `POST /api/auth/sign-up` - Create account and issue session
/// - `POST /api/auth/sign-in` - Verify credentials and issue session
/// - `POST /api/auth/sign-out` - Clear the session cookie
///
/// Sessions travel as a signed token in an HTTP-only cookie rather than an
/// Authorization header; every handler that establishes or ends a session
/// sets the cookie on its own response.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{billing, client_ip},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use teambase_shared::{
    auth::{
        cookie::{build_clear_session_cookie, build_session_cookie, extract_session_token},
        password::{hash_password, verify_password},
        session::{issue_token, verify_token},
    },
    models::{
        activity_log::{ActivityAction, ActivityLog},
        invitation::Invitation,
        team::Team,
        team_member::{TeamMember, TeamRole},
        user::{CreateUser, User},
    },
};
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(
        min = 8,
        max = 100,
        message = "Password must be between 8 and 100 characters"
    ))]
    pub password: String,

    /// Invitation to accept instead of creating a fresh team
    pub invite_id: Option<i64>,
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Post-auth hand-off ("checkout" resumes a pricing-page flow)
    pub redirect: Option<String>,

    /// Price to check out after signing in
    pub price_id: Option<String>,
}

/// Response for sign-up and sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The signed-in user
    pub user: User,

    /// The user's team, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,

    /// Hosted-checkout URL, when the request asked to resume checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// Creates an account, its team (or accepts an invitation), and a session
///
/// Without an invitation the new user becomes the owner of a fresh team
/// named "{email}'s Team". With one, the invitation must be pending and
/// addressed to the same email; the membership role comes from the
/// invitation and the invitation flips to accepted.
///
/// A previously deleted account does not block re-registration: soft
/// deletion renames the stored email, so only live accounts collide.
///
/// All rows (user, team, membership, logs) are written in one transaction;
/// a failure partway through leaves no ownerless user behind.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `400 Bad Request`: invalid or expired invitation
/// - `409 Conflict`: email already in use
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    if User::find_active_by_email(&state.db, &req.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already in use".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let ip = client_ip(&headers);

    let invitation = match req.invite_id {
        Some(invite_id) => Some(
            Invitation::find_pending(&state.db, invite_id, &req.email)
                .await?
                .ok_or_else(|| {
                    ApiError::BadRequest("Invalid or expired invitation".to_string())
                })?,
        ),
        None => None,
    };

    let mut tx = state.db.begin().await?;

    let (user, team_id) = match invitation {
        Some(invitation) => {
            let user = User::create(
                &mut *tx,
                CreateUser {
                    email: req.email.clone(),
                    password_hash,
                    role: invitation.role.as_str().to_string(),
                },
            )
            .await?;

            TeamMember::create(&mut *tx, user.id, invitation.team_id, invitation.role).await?;
            Invitation::mark_accepted(&mut *tx, invitation.id).await?;

            ActivityLog::record(
                &mut *tx,
                invitation.team_id,
                user.id,
                ActivityAction::AcceptInvitation,
                ip.as_deref(),
            )
            .await?;

            (user, invitation.team_id)
        }
        None => {
            let user = User::create(
                &mut *tx,
                CreateUser {
                    email: req.email.clone(),
                    password_hash,
                    role: TeamRole::Owner.as_str().to_string(),
                },
            )
            .await?;

            let team = Team::create(&mut *tx, &format!("{}'s Team", req.email)).await?;
            TeamMember::create(&mut *tx, user.id, team.id, TeamRole::Owner).await?;

            ActivityLog::record(
                &mut *tx,
                team.id,
                user.id,
                ActivityAction::CreateTeam,
                ip.as_deref(),
            )
            .await?;

            (user, team.id)
        }
    };

    ActivityLog::record(
        &mut *tx,
        team_id,
        user.id,
        ActivityAction::SignUp,
        ip.as_deref(),
    )
    .await?;

    tx.commit().await?;

    let token = issue_token(user.id, state.auth_secret())?;
    let cookie = build_session_cookie(&token, state.is_production());

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            team_id: Some(team_id),
            checkout_url: None,
        }),
    )
        .into_response())
}

/// Verifies credentials and issues a session
///
/// An unknown email and a wrong password produce the same message, so the
/// endpoint never confirms whether an address has an account.
///
/// When the request carries `redirect: "checkout"` with a `price_id`, the
/// response additionally includes a hosted-checkout URL so a pricing-page
/// flow interrupted by sign-in can resume. A failed hand-off (user has no
/// team, Stripe unreachable) never blocks the sign-in itself; the URL is
/// simply omitted.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `401 Unauthorized`: invalid email or password
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let user = User::find_active_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let membership = TeamMember::find_first_by_user(&state.db, user.id).await?;

    if let Some(ref membership) = membership {
        ActivityLog::record(
            &state.db,
            membership.team_id,
            user.id,
            ActivityAction::SignIn,
            client_ip(&headers).as_deref(),
        )
        .await?;
    }

    // The hand-off is an extra on top of a successful sign-in: if the
    // checkout URL cannot be built (no team yet, Stripe down), the user
    // still gets their session and lands without a checkout_url.
    let checkout_url = match (req.redirect.as_deref(), req.price_id.as_deref()) {
        (Some("checkout"), Some(price_id)) => {
            match billing::checkout_url_for(&state, user.id, price_id).await {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(user_id = user.id, "checkout hand-off skipped: {:?}", err);
                    None
                }
            }
        }
        _ => None,
    };

    let token = issue_token(user.id, state.auth_secret())?;
    let cookie = build_session_cookie(&token, state.is_production());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            team_id: membership.map(|m| m.team_id),
            checkout_url,
        }),
    )
        .into_response())
}

/// Ends the session by clearing the cookie
///
/// Works for stale or missing sessions too: clearing an absent cookie is a
/// no-op, so this endpoint never fails for auth reasons. A still-valid
/// session gets a SIGN_OUT entry in the activity log first.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    // Best-effort audit: only a verifiable session can be attributed
    if let Some(user_id) = current_user_from_headers(&headers, state.auth_secret()) {
        if let Some(membership) = TeamMember::find_first_by_user(&state.db, user_id).await? {
            ActivityLog::record(
                &state.db,
                membership.team_id,
                user_id,
                ActivityAction::SignOut,
                client_ip(&headers).as_deref(),
            )
            .await?;
        }
    }

    let cookie = build_clear_session_cookie(state.is_production());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "signed_out" })),
    )
        .into_response())
}

/// Extracts a verified user ID from request headers, if any
fn current_user_from_headers(headers: &HeaderMap, secret: &str) -> Option<i64> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = extract_session_token(cookie_header)?;
    verify_token(&token, secret).ok().map(|claims| claims.sub)
}
