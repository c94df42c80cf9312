/// Database-backed integration tests
///
/// These tests exercise the flows that need real rows: sign-up's
/// transactional write set, invitation acceptance, the soft-delete email
/// rules, and checkout reconciliation against seeded data. They read
/// `DATABASE_URL` and skip when it is absent, so the suite stays green on
/// machines without Postgres.

mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::TestContext;
use serde_json::{json, Value};
use teambase_api::routes::billing::{apply_checkout, CheckoutError};
use teambase_api::stripe::{
    CheckoutSession, Expandable, Price, Subscription, SubscriptionItem, SubscriptionItemList,
};
use teambase_shared::auth::password::hash_password;
use teambase_shared::models::{
    invitation::Invitation,
    team::Team,
    team_member::{TeamMember, TeamRole},
    user::{CreateUser, User},
};
use tower::Service as _;

/// Builds an email no other test run has used
fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}@example.com", prefix, nanos)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(ctx: &TestContext, uri: &str, body: Value) -> axum::response::Response {
    ctx.app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Seeds a user directly, bypassing the HTTP surface
async fn seed_user(ctx: &TestContext, email: &str, password: &str) -> User {
    User::create(
        &ctx.db,
        CreateUser {
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            role: "owner".to_string(),
        },
    )
    .await
    .unwrap()
}

/// Builds a retrieved-checkout-session value the way Stripe returns it,
/// with the subscription expanded inline
fn checkout_session_for(user_id: i64, customer_id: &str, subscription_id: &str) -> CheckoutSession {
    CheckoutSession {
        id: "cs_test".to_string(),
        url: None,
        client_reference_id: Some(user_id.to_string()),
        customer: Some(Expandable::Id(customer_id.to_string())),
        subscription: Some(Expandable::Object(Subscription {
            id: subscription_id.to_string(),
            status: "trialing".to_string(),
            items: SubscriptionItemList {
                data: vec![SubscriptionItem {
                    price: Price {
                        id: "price_1".to_string(),
                        product: Expandable::Id("prod_1".to_string()),
                    },
                }],
            },
        })),
    }
}

#[tokio::test]
async fn test_sign_up_creates_owner_team_and_ordered_logs() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    let email = unique_email("owner");
    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": email, "password": "password123"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "owner");
    let user_id = body["user"]["id"].as_i64().unwrap();
    let team_id = body["team_id"].as_i64().unwrap();

    let team_name: String = sqlx::query_scalar("SELECT name FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(team_name, format!("{}'s Team", email));

    let membership = TeamMember::find_first_by_user(&ctx.db, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.team_id, team_id);
    assert_eq!(membership.role, TeamRole::Owner);

    // Insertion order, not timestamps: same-transaction rows can tie on NOW()
    let actions: Vec<String> =
        sqlx::query_scalar("SELECT action FROM activity_logs WHERE team_id = $1 ORDER BY id")
            .bind(team_id)
            .fetch_all(&ctx.db)
            .await
            .unwrap();
    assert_eq!(actions, vec!["CREATE_TEAM", "SIGN_UP"]);
}

#[tokio::test]
async fn test_sign_up_with_accepted_invitation_fails_and_writes_nothing() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    let owner = seed_user(&ctx, &unique_email("inviter"), "password123").await;
    let team = Team::create(&ctx.db, "Invite Test Team").await.unwrap();
    TeamMember::create(&ctx.db, owner.id, team.id, TeamRole::Owner)
        .await
        .unwrap();

    let invitee_email = unique_email("invitee");
    let invitation = Invitation::create(&ctx.db, team.id, &invitee_email, TeamRole::Member, owner.id)
        .await
        .unwrap();
    assert!(Invitation::mark_accepted(&ctx.db, invitation.id).await.unwrap());

    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": invitee_email, "password": "password123", "invite_id": invitation.id}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid or expired invitation");

    assert!(User::find_active_by_email(&ctx.db, &invitee_email)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_email_blocks_until_soft_deleted() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    let email = unique_email("dup");

    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = body_json(response).await["user"]["id"].as_i64().unwrap();

    // Live account holds the address
    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "Email already in use");

    // Soft deletion renames the stored email, freeing it
    TeamMember::delete_by_user(&ctx.db, user_id).await.unwrap();
    assert!(User::soft_delete(&ctx.db, user_id).await.unwrap());

    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_failed_sign_up_leaves_no_partial_rows() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    // Long enough that "{email}'s Team" overflows teams.name VARCHAR(100):
    // the user insert succeeds, the team insert fails, and the whole
    // transaction must roll back.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let local = format!("{:0>64}", nanos);
    let email = format!("{}@{}.example.com", local, "a".repeat(40));

    let response = post_json(
        &ctx,
        "/api/auth/sign-up",
        json!({"email": email, "password": "password123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert!(User::find_active_by_email(&ctx.db, &email)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_soft_delete_handles_long_emails() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    // The rename appends "-{id}-deleted"; a near-limit address must still fit
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let email = format!("{}-{}@example.com", "a".repeat(220), nanos);
    let user = seed_user(&ctx, &email, "password123").await;

    assert!(User::soft_delete(&ctx.db, user.id).await.unwrap());

    let stored: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert!(stored.ends_with(&format!("-{}-deleted", user.id)));
    assert!(User::find_active_by_email(&ctx.db, &email)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_checkout_without_team_aborts_before_any_write() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    let user = seed_user(&ctx, &unique_email("teamless"), "password123").await;
    let customer_id = format!("cus_noteam_{}", user.id);
    let session = checkout_session_for(user.id, &customer_id, "sub_noteam");

    let result = apply_checkout(&ctx.db, &session, "Plus").await;
    assert!(matches!(result, Err(CheckoutError::NoTeam(id)) if id == user.id));

    let written: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE stripe_customer_id = $1")
            .bind(&customer_id)
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(written, 0);
}

#[tokio::test]
async fn test_checkout_applied_twice_converges_on_same_state() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    let user = seed_user(&ctx, &unique_email("billed"), "password123").await;
    let team = Team::create(&ctx.db, "Billed Team").await.unwrap();
    TeamMember::create(&ctx.db, user.id, team.id, TeamRole::Owner)
        .await
        .unwrap();

    let customer_id = format!("cus_idem_{}", user.id);
    let subscription_id = format!("sub_idem_{}", user.id);
    let session = checkout_session_for(user.id, &customer_id, &subscription_id);

    let first = apply_checkout(&ctx.db, &session, "Plus").await.unwrap();
    let after_first = Team::find_by_id(&ctx.db, team.id).await.unwrap().unwrap();

    let second = apply_checkout(&ctx.db, &session, "Plus").await.unwrap();
    let after_second = Team::find_by_id(&ctx.db, team.id).await.unwrap().unwrap();

    assert_eq!(first, user.id);
    assert_eq!(second, user.id);
    assert_eq!(after_first.stripe_customer_id, after_second.stripe_customer_id);
    assert_eq!(
        after_first.stripe_subscription_id,
        after_second.stripe_subscription_id
    );
    assert_eq!(after_first.stripe_product_id, after_second.stripe_product_id);
    assert_eq!(after_first.plan_name, Some("Plus".to_string()));
    assert_eq!(after_second.plan_name, Some("Plus".to_string()));
    assert_eq!(after_second.subscription_status, Some("trialing".to_string()));
}

#[tokio::test]
async fn test_sign_in_survives_failed_checkout_handoff() {
    let Some(ctx) = TestContext::with_database().await else {
        eprintln!("skipping: DATABASE_URL is not set");
        return;
    };

    // No membership, so the hand-off fails before any Stripe call; the
    // sign-in itself must still succeed with a session cookie.
    let email = unique_email("handoff");
    seed_user(&ctx, &email, "password123").await;

    let response = post_json(
        &ctx,
        "/api/auth/sign-in",
        json!({
            "email": email,
            "password": "password123",
            "redirect": "checkout",
            "price_id": "price_123"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session="));

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], email);
    assert!(body.get("checkout_url").is_none());
}
