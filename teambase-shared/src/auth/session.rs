/// Session credential issuance and verification
///
/// This module provides the signed session credential used by every
/// authenticated request. The credential is a compact HS256-signed token
/// carrying the user's identity and an expiry; it is stored client-side in an
/// HTTP-only cookie and verified statelessly (no database round trip).
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Lifetime**: 24 hours, slid forward on every authenticated request
/// - **Validation**: Signature, expiration, and issuer checks
/// - **Secret Management**: The secret must be at least 32 bytes; the server
///   refuses to start without one (enforced by the config layer)
///
/// # Failure semantics
///
/// Verification failures are typed errors, never panics. Callers treat any
/// failure (bad signature, malformed payload, expiry in the past) as
/// "no session" rather than surfacing it to the client.
///
/// # Example
///
/// ```
/// use teambase_shared::auth::session::{issue_token, verify_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let token = issue_token(42, secret)?;
///
/// let claims = verify_token(&token, secret)?;
/// assert_eq!(claims.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session lifetime policy: 24 hours from issuance.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Token issuer claim, checked on every verification.
const ISSUER: &str = "teambase";

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to sign the credential
    #[error("Failed to create session token: {0}")]
    CreateError(String),

    /// Signature or payload failed verification
    #[error("Failed to verify session token: {0}")]
    VerificationError(String),

    /// Credential expiry is in the past
    #[error("Session has expired")]
    Expired,

    /// Issuer claim does not match
    #[error("Invalid session issuer")]
    InvalidIssuer,
}

/// Claims embedded in the session credential
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "teambase")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - User ID
    pub sub: i64,

    /// Issuer - Always "teambase"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Creates new claims expiring [`SESSION_TTL_HOURS`] from now
    pub fn new(user_id: i64) -> Self {
        Self::with_expiry(user_id, Duration::hours(SESSION_TTL_HOURS))
    }

    /// Creates claims with a custom time-to-expiry
    ///
    /// Negative durations produce an already-expired credential, which is
    /// useful for testing the expiry path.
    pub fn with_expiry(user_id: i64, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    /// Checks whether the credential's expiry is in the past
    ///
    /// An expired credential is structurally valid but must be treated as
    /// "no session" by every caller.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time remaining until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Issues a signed session token for a user
///
/// The token expires [`SESSION_TTL_HOURS`] from now and is signed with the
/// server secret using HS256.
///
/// # Arguments
///
/// * `user_id` - ID of the authenticated user
/// * `secret` - Server signing secret (at least 32 bytes)
///
/// # Errors
///
/// Returns `SessionError::CreateError` if signing fails
pub fn issue_token(user_id: i64, secret: &str) -> Result<String, SessionError> {
    sign_claims(&SessionClaims::new(user_id), secret)
}

/// Signs an explicit set of claims
///
/// Used by [`issue_token`] and by tests that need control over expiry.
pub fn sign_claims(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a session token and extracts its claims
///
/// Verifies:
/// - Signature is valid for the given secret
/// - Token has not expired
/// - Issuer is "teambase"
///
/// # Errors
///
/// Returns a typed error for every failure mode; a missing or garbage token
/// string never panics. Callers treat any error as an anonymous request.
pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => SessionError::InvalidIssuer,
            _ => SessionError::VerificationError(format!("Token verification failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}

/// Re-issues a token with a fresh expiry for the same user
///
/// Applied on every authenticated request to slide the session window
/// forward: the new token carries the same `sub` and a new `exp` of
/// [`SESSION_TTL_HOURS`] from now.
///
/// # Example
///
/// ```
/// use teambase_shared::auth::session::{issue_token, refresh_token, verify_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let token = issue_token(7, secret)?;
/// let claims = verify_token(&token, secret)?;
///
/// let refreshed = refresh_token(&claims, secret)?;
/// assert_eq!(verify_token(&refreshed, secret)?.sub, 7);
/// # Ok(())
/// # }
/// ```
pub fn refresh_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    issue_token(claims.sub, secret)
}
