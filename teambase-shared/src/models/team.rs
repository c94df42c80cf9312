/// Team model and database operations
///
/// Teams are the billing granularity: one external Stripe identity per team.
/// The billing columns are written only by the checkout reconciler, as a
/// single full overwrite, which makes duplicate callback delivery naturally
/// idempotent at the data level.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     stripe_customer_id TEXT UNIQUE,
///     stripe_subscription_id TEXT UNIQUE,
///     stripe_product_id TEXT,
///     plan_name VARCHAR(50),
///     subscription_status VARCHAR(20)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Team model representing a billing account shared by its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID
    pub id: i64,

    /// Team display name
    pub name: String,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated (refreshed on every billing write)
    pub updated_at: DateTime<Utc>,

    /// Stripe customer ID (set after first completed checkout)
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID
    pub stripe_subscription_id: Option<String>,

    /// Stripe product ID of the subscribed plan
    pub stripe_product_id: Option<String>,

    /// Display name of the subscribed plan (Stripe product name)
    pub plan_name: Option<String>,

    /// Subscription status as reported by Stripe ("active", "trialing", ...)
    pub subscription_status: Option<String>,
}

/// Full-overwrite billing update applied by the checkout reconciler
///
/// Every field is written unconditionally; re-applying the same update
/// leaves the row in the same final state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingUpdate {
    /// Stripe customer ID
    pub stripe_customer_id: String,

    /// Stripe subscription ID
    pub stripe_subscription_id: String,

    /// Stripe product ID
    pub stripe_product_id: String,

    /// Plan display name
    pub plan_name: String,

    /// Subscription status
    pub subscription_status: String,
}

impl Team {
    /// Creates a new team
    ///
    /// Takes any executor so the insert can join sign-up's transaction.
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at,
                      stripe_customer_id, stripe_subscription_id,
                      stripe_product_id, plan_name, subscription_status
            "#,
        )
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(team)
    }

    /// Finds a team by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, created_at, updated_at,
                   stripe_customer_id, stripe_subscription_id,
                   stripe_product_id, plan_name, subscription_status
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Overwrites the team's billing state and refreshes `updated_at`
    ///
    /// All five billing fields are replaced in one statement, which makes a
    /// replayed checkout callback converge on the same state. Returns the
    /// updated team, or None if the team no longer exists.
    pub async fn update_billing(
        pool: &PgPool,
        id: i64,
        data: BillingUpdate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET stripe_customer_id = $2,
                stripe_subscription_id = $3,
                stripe_product_id = $4,
                plan_name = $5,
                subscription_status = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at,
                      stripe_customer_id, stripe_subscription_id,
                      stripe_product_id, plan_name, subscription_status
            "#,
        )
        .bind(id)
        .bind(data.stripe_customer_id)
        .bind(data.stripe_subscription_id)
        .bind(data.stripe_product_id)
        .bind(data.plan_name)
        .bind(data.subscription_status)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }
}
