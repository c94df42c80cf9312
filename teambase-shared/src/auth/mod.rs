/// Authentication utilities for Teambase
///
/// This module provides the stateless session layer and password hashing:
///
/// - `session`: signed session credential issuance, verification, and
///   sliding refresh (HS256, 24h lifetime)
/// - `password`: Argon2id password hashing and verification
/// - `cookie`: session cookie construction and extraction

pub mod cookie;
pub mod password;
pub mod session;
