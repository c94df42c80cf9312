/// Middleware for the API server
///
/// - `security`: OWASP-recommended response headers
/// - `session`: session-cookie authentication with sliding expiration

pub mod security;
pub mod session;
