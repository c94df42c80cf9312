/// Session authentication middleware
///
/// Guards routes that require a signed-in user. The session travels as a
/// signed token in an HTTP-only cookie; this layer extracts and verifies it,
/// then injects the authenticated principal into request extensions.
///
/// Every verified request also gets a refreshed token appended to the
/// response, so active users keep a sliding expiration window instead of
/// being signed out mid-session. Handlers that set the session cookie
/// themselves (sign-out, account deletion) take precedence over the refresh.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use teambase_shared::auth::{
    cookie::{build_session_cookie, extract_session_token, SESSION_COOKIE_NAME},
    session::{refresh_token, verify_token},
};

use crate::{app::AppState, error::ApiError};

/// The authenticated principal, injected into request extensions
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// Verified user ID from the session token
    pub user_id: i64,
}

/// Session authentication middleware layer
///
/// Any failure mode (missing cookie, bad signature, expired token, wrong
/// issuer) is treated as an anonymous request and rejected with 401.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let token = extract_session_token(cookie_header)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let claims = verify_token(&token, state.auth_secret())?;
    let user_id = claims.sub;

    req.extensions_mut().insert(CurrentUser { user_id });

    let mut response = next.run(req).await;

    // Sliding expiration: re-issue the token unless the handler already
    // replaced or cleared the session cookie.
    if !sets_session_cookie(&response) {
        if let Ok(refreshed) = refresh_token(&claims, state.auth_secret()) {
            let cookie = build_session_cookie(&refreshed, state.is_production());
            if let Ok(value) = cookie.parse() {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }

    Ok(response)
}

/// Checks whether the response already sets the session cookie
fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{}=", SESSION_COOKIE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    #[test]
    fn test_sets_session_cookie_detection() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::SET_COOKIE, "session=abc; Path=/; HttpOnly")
            .body(Body::empty())
            .unwrap();
        assert!(sets_session_cookie(&response));

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::SET_COOKIE, "other=abc; Path=/")
            .body(Body::empty())
            .unwrap();
        assert!(!sets_session_cookie(&response));

        let response = Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap();
        assert!(!sets_session_cookie(&response));
    }
}
