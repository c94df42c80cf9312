//! # Teambase API Server Library
//!
//! This library provides the core functionality for the Teambase API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and session authentication
//! - `routes`: API route handlers
//! - `stripe`: Minimal Stripe API client

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod stripe;
