/// API route handlers
///
/// # Modules
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-up, sign-in, sign-out
/// - `account`: Account profile, password, deletion
/// - `team`: Team view, invitations, member removal, activity feed
/// - `billing`: Stripe checkout, callback reconciliation, billing portal

pub mod account;
pub mod auth;
pub mod billing;
pub mod health;
pub mod team;

use axum::http::HeaderMap;

/// Extracts the client IP for activity logging
///
/// Behind a proxy the client address arrives in `x-forwarded-for`; the
/// first entry is the originating client. Absent header means no IP is
/// recorded, never a failure.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
