/// Common test utilities for integration tests
///
/// Builds the full router against a lazily-connected pool, so tests that
/// exercise the HTTP surface itself (authentication gating, validation,
/// redirect behavior) run without a live database. Tests that need real
/// rows read `DATABASE_URL` and skip when it is absent.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use teambase_api::app::{build_router, AppState};
use teambase_api::config::{ApiConfig, AuthConfig, Config, DatabaseConfig, StripeConfig};
use teambase_shared::auth::session::issue_token;

/// Signing secret shared by test tokens and the test router
pub const TEST_AUTH_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context holding the built application and its pool
pub struct TestContext {
    pub app: axum::Router,
    pub db: PgPool,
}

impl TestContext {
    /// Creates a test context with a lazily-connected database pool
    ///
    /// No connection is attempted until a handler actually queries, so
    /// surface-level tests stay deterministic.
    pub fn new() -> Self {
        let config = test_config("postgresql://127.0.0.1:1/teambase_test".to_string());

        let db = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_lazy(&config.database.url)
            .expect("lazy pool construction should not fail");

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        Self { app, db }
    }

    /// Creates a test context backed by a real database
    ///
    /// Reads `DATABASE_URL` and returns None when it is absent, so
    /// database-backed tests skip on machines without Postgres. Migrations
    /// run before the context is handed out.
    pub async fn with_database() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("connect to the test database");

        sqlx::migrate!("../teambase-shared/migrations")
            .run(&db)
            .await
            .expect("run migrations");

        let state = AppState::new(db.clone(), test_config(url));
        let app = build_router(state);

        Some(Self { app, db })
    }

    /// Builds a valid session cookie header value for a user ID
    pub fn session_cookie(&self, user_id: i64) -> String {
        let token = issue_token(user_id, TEST_AUTH_SECRET).expect("token issuance");
        format!("session={}", token)
    }
}

fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:8080".to_string(),
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 2,
        },
        auth: AuthConfig {
            secret: TEST_AUTH_SECRET.to_string(),
        },
        stripe: StripeConfig {
            secret_key: "sk_test_unused".to_string(),
        },
    }
}
