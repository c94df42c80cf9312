/// Session cookie construction and extraction
///
/// Centralises `Set-Cookie` header building for the session credential so
/// every handler that issues, refreshes, or clears a session produces the
/// same attributes.
///
/// # Cookie attributes
///
/// - Name: `session`
/// - `HttpOnly` (never readable from script)
/// - `SameSite=Lax`
/// - `Path=/`
/// - Max-Age matching the session TTL (24h)

use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use super::session::SESSION_TTL_HOURS;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Builds a `Set-Cookie` header value carrying a session token
///
/// The cookie expiry matches the token expiry, so a stale cookie and a stale
/// token age out together.
///
/// # Example
///
/// ```
/// use teambase_shared::auth::cookie::build_session_cookie;
///
/// let header = build_session_cookie("signed-token", false);
/// assert!(header.starts_with("session=signed-token"));
/// assert!(header.contains("HttpOnly"));
/// ```
pub fn build_session_cookie(token: &str, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(SESSION_TTL_HOURS))
        .build()
        .to_string()
}

/// Builds a `Set-Cookie` header value that clears the session cookie
///
/// Sets an empty value and a max-age of zero so the browser discards the
/// cookie immediately.
pub fn build_clear_session_cookie(secure: bool) -> String {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .build()
        .to_string()
}

/// Extracts the session token from a request `Cookie` header value
///
/// Returns `None` when the header has no `session` cookie or the header is
/// malformed; a garbage header is treated as "no session", never an error.
pub fn extract_session_token(cookie_header: &str) -> Option<String> {
    Cookie::split_parse(cookie_header)
        .filter_map(|c| c.ok())
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_session_cookie_attributes() {
        let header = build_session_cookie("abc123", false);

        assert!(header.starts_with("session=abc123"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=86400"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_build_session_cookie_secure() {
        let header = build_session_cookie("abc123", true);
        assert!(header.contains("Secure"));
    }

    #[test]
    fn test_build_clear_session_cookie() {
        let header = build_clear_session_cookie(false);

        assert!(header.starts_with("session="));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_session_token() {
        let token = extract_session_token("session=tok; other=1");
        assert_eq!(token.as_deref(), Some("tok"));

        let token = extract_session_token("other=1; session=tok2");
        assert_eq!(token.as_deref(), Some("tok2"));
    }

    #[test]
    fn test_extract_session_token_missing() {
        assert!(extract_session_token("other=1").is_none());
        assert!(extract_session_token("").is_none());
        assert!(extract_session_token(";;;=;;").is_none());
    }
}
