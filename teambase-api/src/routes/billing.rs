/// Billing endpoints
///
/// Hosted-checkout initiation, the post-checkout reconciliation callback,
/// and the customer billing portal.
///
/// # Endpoints
///
/// - `POST /api/billing/checkout` - Start a hosted-checkout session
/// - `GET  /api/billing/checkout` - Stripe redirect callback (reconciler)
/// - `POST /api/billing/portal` - Billing-portal session
///
/// # Reconciliation
///
/// The callback never trusts the redirect: it re-fetches the completed
/// session from Stripe, ties it back to a local user through the integer
/// correlation value embedded at creation, resolves that user's team, and
/// overwrites the team's billing fields in one statement. Because the
/// overwrite is total, a replayed callback converges on the same state.
/// Every failure mode lands on the same `/pricing` redirect with the
/// detail kept server-side.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::CurrentUser,
    stripe::{CheckoutSession, CreateCheckoutSession, StripeError, Subscription},
};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use teambase_shared::{
    auth::{cookie::build_session_cookie, session::issue_token},
    models::{
        team::{BillingUpdate, Team},
        team_member::TeamMember,
        user::User,
    },
};

/// Free trial granted on new subscriptions, in days
const TRIAL_PERIOD_DAYS: u32 = 14;

/// Failure modes of checkout reconciliation
///
/// These never reach the client; the callback logs them and issues a
/// generic `/pricing` redirect.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("no session_id in callback")]
    MissingSessionId,

    #[error("Stripe request failed: {0}")]
    Stripe(#[from] StripeError),

    #[error("checkout session has no customer")]
    MissingCustomer,

    #[error("checkout session has no subscription")]
    MissingSubscription,

    #[error("subscription was not expanded in the session")]
    SubscriptionNotExpanded,

    #[error("subscription has no items")]
    MissingPlan,

    #[error("checkout session has no client_reference_id")]
    MissingCorrelation,

    #[error("client_reference_id {0:?} is not a valid user id")]
    InvalidCorrelation(String),

    #[error("no active user with id {0}")]
    UserNotFound(i64),

    #[error("user {0} has no team membership")]
    NoTeam(i64),

    #[error("team {0} no longer exists")]
    TeamMissing(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checkout initiation request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Price the user is subscribing to
    pub price_id: String,
}

/// Response carrying a hosted URL to redirect the browser to
#[derive(Debug, Serialize)]
pub struct HostedUrlResponse {
    /// Where the client should send the browser
    pub url: String,
}

/// Callback query parameters
#[derive(Debug, Deserialize)]
pub struct CheckoutCallbackQuery {
    /// Completed checkout session ID appended by Stripe
    pub session_id: Option<String>,
}

/// Starts a hosted-checkout session for the acting user's team
///
/// The session embeds the acting user's ID as the correlation value the
/// callback reads back, and reuses the team's Stripe customer when one
/// exists so Stripe does not create duplicates.
///
/// # Errors
///
/// - `404 Not Found`: user has no team
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateCheckoutRequest>,
) -> ApiResult<Json<HostedUrlResponse>> {
    let url = checkout_url_for(&state, current.user_id, &req.price_id).await?;
    Ok(Json(HostedUrlResponse { url }))
}

/// Builds a hosted-checkout URL for a user and price
///
/// Shared with sign-in, which resumes an interrupted pricing-page flow by
/// handing the fresh session a checkout URL.
pub(crate) async fn checkout_url_for(
    state: &AppState,
    user_id: i64,
    price_id: &str,
) -> Result<String, ApiError> {
    let membership = TeamMember::find_first_by_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not part of a team".to_string()))?;

    let team = Team::find_by_id(&state.db, membership.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let session = state
        .stripe
        .create_checkout_session(CreateCheckoutSession {
            price_id: price_id.to_string(),
            client_reference_id: user_id,
            customer: team.stripe_customer_id,
            success_url: format!(
                "{}/api/billing/checkout?session_id={{CHECKOUT_SESSION_ID}}",
                state.base_url()
            ),
            cancel_url: format!("{}/pricing", state.base_url()),
            trial_period_days: TRIAL_PERIOD_DAYS,
        })
        .await?;

    session
        .url
        .ok_or_else(|| ApiError::InternalError("Checkout session has no URL".to_string()))
}

/// Stripe redirect callback: reconciles a completed checkout
///
/// On success the browser lands on `/dashboard` with a fresh session
/// cookie (the user just came back from Stripe, so their session is
/// re-issued as an implicit auth event). On any failure the browser lands
/// on `/pricing` and the cause is logged server-side only.
pub async fn checkout_callback(
    State(state): State<AppState>,
    Query(query): Query<CheckoutCallbackQuery>,
) -> Response {
    match reconcile_checkout(&state, query.session_id.as_deref()).await {
        Ok(user_id) => {
            let cookie = match issue_token(user_id, state.auth_secret())
                .map(|token| build_session_cookie(&token, state.is_production()))
            {
                Ok(cookie) => cookie,
                Err(err) => {
                    tracing::error!("checkout reconciled but session issuance failed: {}", err);
                    return Redirect::to("/pricing").into_response();
                }
            };

            tracing::info!(user_id, "checkout reconciled, billing updated");

            (
                [(header::SET_COOKIE, cookie)],
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!("checkout reconciliation failed: {}", err);
            Redirect::to("/pricing").into_response()
        }
    }
}

/// Runs the reconciliation sequence, returning the correlated user ID
///
/// The remote half: resolve the callback's session id against Stripe and
/// fetch the plan name, then hand the retrieved session to
/// [`apply_checkout`] for the local writes.
async fn reconcile_checkout(
    state: &AppState,
    session_id: Option<&str>,
) -> Result<i64, CheckoutError> {
    let session_id = session_id.ok_or(CheckoutError::MissingSessionId)?;

    let session = state.stripe.retrieve_checkout_session(session_id).await?;

    let subscription = extract_subscription(&session)?;
    let product_id = extract_product_id(subscription)?.to_string();
    let product = state.stripe.retrieve_product(&product_id).await?;

    apply_checkout(&state.db, &session, &product.name).await
}

/// Applies a retrieved checkout session to local records
///
/// The sequence is strictly ordered; the first unmet precondition aborts
/// before any team row is touched. The billing write is a full overwrite,
/// so applying the same session twice converges on the same state.
pub async fn apply_checkout(
    db: &PgPool,
    session: &CheckoutSession,
    plan_name: &str,
) -> Result<i64, CheckoutError> {
    let customer_id = extract_customer_id(session)?.to_string();
    let subscription = extract_subscription(session)?;
    let product_id = extract_product_id(subscription)?.to_string();

    let user_id = extract_correlation_id(session)?;

    let user = User::find_active_by_id(db, user_id)
        .await?
        .ok_or(CheckoutError::UserNotFound(user_id))?;

    let membership = TeamMember::find_first_by_user(db, user.id)
        .await?
        .ok_or(CheckoutError::NoTeam(user.id))?;

    Team::update_billing(
        db,
        membership.team_id,
        BillingUpdate {
            stripe_customer_id: customer_id,
            stripe_subscription_id: subscription.id.clone(),
            stripe_product_id: product_id,
            plan_name: plan_name.to_string(),
            subscription_status: subscription.status.clone(),
        },
    )
    .await?
    .ok_or(CheckoutError::TeamMissing(membership.team_id))?;

    Ok(user.id)
}

/// Pulls the customer ID out of a retrieved checkout session
fn extract_customer_id(session: &CheckoutSession) -> Result<&str, CheckoutError> {
    session
        .customer
        .as_ref()
        .map(|c| c.id())
        .ok_or(CheckoutError::MissingCustomer)
}

/// Pulls the expanded subscription out of a retrieved checkout session
fn extract_subscription(session: &CheckoutSession) -> Result<&Subscription, CheckoutError> {
    session
        .subscription
        .as_ref()
        .ok_or(CheckoutError::MissingSubscription)?
        .as_object()
        .ok_or(CheckoutError::SubscriptionNotExpanded)
}

/// Parses the correlation value back into a user ID
///
/// The value was written at checkout creation as the acting user's integer
/// ID; anything absent or non-numeric means the session cannot be tied to
/// a local user.
fn extract_correlation_id(session: &CheckoutSession) -> Result<i64, CheckoutError> {
    let raw = session
        .client_reference_id
        .as_deref()
        .ok_or(CheckoutError::MissingCorrelation)?;

    raw.parse::<i64>()
        .map_err(|_| CheckoutError::InvalidCorrelation(raw.to_string()))
}

/// Pulls the billed product ID out of the subscription's first item
fn extract_product_id(subscription: &Subscription) -> Result<&str, CheckoutError> {
    subscription
        .items
        .data
        .first()
        .map(|item| item.price.product.id())
        .ok_or(CheckoutError::MissingPlan)
}

/// Creates a billing-portal session for the acting user's team
///
/// Teams that never checked out have nothing to manage; they get sent to
/// the pricing page instead.
pub async fn customer_portal(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<HostedUrlResponse>> {
    let membership = TeamMember::find_first_by_user(&state.db, current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not part of a team".to_string()))?;

    let team = Team::find_by_id(&state.db, membership.team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let customer = match (&team.stripe_customer_id, &team.stripe_product_id) {
        (Some(customer), Some(_)) => customer.clone(),
        _ => {
            return Ok(Json(HostedUrlResponse {
                url: format!("{}/pricing", state.base_url()),
            }))
        }
    };

    let portal = state
        .stripe
        .create_portal_session(&customer, &format!("{}/dashboard", state.base_url()))
        .await?;

    Ok(Json(HostedUrlResponse { url: portal.url }))
}
