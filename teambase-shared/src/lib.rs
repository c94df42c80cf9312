//! # Teambase Shared Library
//!
//! Shared types and business logic used by the Teambase API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and typed repository operations
//! - `auth`: Session credentials, password hashing, session cookies
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Teambase shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
