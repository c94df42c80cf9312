/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use teambase_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = teambase_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_auth_layer},
    stripe::StripeClient,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Stripe API client
    pub stripe: StripeClient,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let stripe = StripeClient::new(config.stripe.secret_key.clone());
        Self {
            db,
            config: Arc::new(config),
            stripe,
        }
    }

    /// Gets the session signing secret
    pub fn auth_secret(&self) -> &str {
        &self.config.auth.secret
    }

    /// Whether the server runs in production mode (Secure cookies, HSTS)
    pub fn is_production(&self) -> bool {
        self.config.api.production
    }

    /// Public base URL used to build redirect targets
    pub fn base_url(&self) -> &str {
        &self.config.api.base_url
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// ├── /api/
/// │   ├── /auth/                     # Authentication (public)
/// │   │   ├── POST /sign-up
/// │   │   ├── POST /sign-in
/// │   │   └── POST /sign-out
/// │   ├── /billing/
/// │   │   ├── GET  /checkout         # Stripe redirect callback (public)
/// │   │   ├── POST /checkout         # Start checkout (session)
/// │   │   └── POST /portal           # Billing portal (session)
/// │   ├── /account                   # GET / PUT / DELETE (session)
/// │   │   └── PUT /password
/// │   ├── /team                      # GET (session)
/// │   │   ├── POST   /invitations
/// │   │   └── DELETE /members/:id
/// │   └── /activity                  # GET (session)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public; sign-out only clears the cookie, so it stays
    // callable with a stale session)
    let auth_routes = Router::new()
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-in", post(routes::auth::sign_in))
        .route("/sign-out", post(routes::auth::sign_out));

    // Stripe redirects back here after hosted checkout; the browser carries
    // no guaranteed session at that point, so the callback is public and
    // authenticates through the session re-fetched from Stripe.
    let checkout_callback = Router::new()
        .route("/billing/checkout", get(routes::billing::checkout_callback));

    // Everything below requires a verified session cookie
    let session_routes = Router::new()
        .route(
            "/account",
            get(routes::account::get_account)
                .put(routes::account::update_account)
                .delete(routes::account::delete_account),
        )
        .route("/account/password", put(routes::account::update_password))
        .route("/team", get(routes::team::get_team))
        .route("/team/invitations", post(routes::team::invite_member))
        .route("/team/members/:id", delete(routes::team::remove_member))
        .route("/activity", get(routes::team::list_activity))
        .route("/billing/checkout", post(routes::billing::create_checkout))
        .route("/billing/portal", post(routes::billing::customer_portal))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(checkout_callback)
        .merge(session_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.production {
        let origin: Vec<HeaderValue> = state
            .config
            .api
            .base_url
            .parse()
            .into_iter()
            .collect();

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    } else {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
