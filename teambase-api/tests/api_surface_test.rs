/// Integration tests for the API surface
///
/// These tests exercise routing, session gating, request validation, and
/// the checkout callback's failure redirect through the full middleware
/// stack. They use a lazily-connected pool, so no database is required:
/// every request here is rejected (or answered) before a query runs.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::TestContext;
use serde_json::{json, Value};
use tower::Service as _;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint_responds() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // No live database behind the pool, so the service reports degraded
    // rather than failing the request.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_session_routes_reject_anonymous_requests() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("GET", "/api/account"),
        ("GET", "/api/team"),
        ("GET", "/api/activity"),
        ("POST", "/api/billing/portal"),
    ] {
        let response = ctx
            .app
            .clone()
            .call(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should require a session",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn test_garbage_session_cookie_is_anonymous() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri("/api/account")
                .header(header::COOKIE, "session=not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_wrong_secret_session_cookie_is_anonymous() {
    let ctx = TestContext::new();

    let token =
        teambase_shared::auth::session::issue_token(1, "some-other-secret-thats-32-bytes-xx")
            .unwrap();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri("/api/account")
                .header(header::COOKIE, format!("session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_callback_without_session_id_redirects_to_pricing() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri("/api/billing/checkout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/pricing");
}

#[tokio::test]
async fn test_sign_up_validates_email_format() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/api/auth/sign-up")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": "not-an-email", "password": "password123"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_sign_up_validates_password_length() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/api/auth/sign-up")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": "user@example.com", "password": "short"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_sign_in_validates_before_touching_credentials() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/api/auth/sign-in")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": "bad", "password": ""}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sign_out_clears_cookie_without_session() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("POST")
                .uri("/api/auth/sign-out")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_security_headers_present_on_error_responses() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri("/api/account")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_cookie_helper_round_trips() {
    let ctx = TestContext::new();

    let cookie = ctx.session_cookie(7);
    let token = cookie.strip_prefix("session=").unwrap();
    let claims =
        teambase_shared::auth::session::verify_token(token, common::TEST_AUTH_SECRET).unwrap();
    assert_eq!(claims.sub, 7);
}
