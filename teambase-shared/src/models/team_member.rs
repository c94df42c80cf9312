/// Team membership model and database operations
///
/// Joins users to teams with a role. The model is single-team: a user has
/// zero or one membership, and where multiple rows exist the first (lowest
/// id) is authoritative.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE team_members (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     team_id BIGINT NOT NULL REFERENCES teams(id),
///     role VARCHAR(50) NOT NULL,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Role of a user within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Full control: billing, invitations, member removal
    Owner,

    /// Regular member
    Member,
}

impl TeamRole {
    /// Converts role to string for display and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "owner",
            TeamRole::Member => "member",
        }
    }

    /// Parses a role from its stored string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(TeamRole::Owner),
            "member" => Some(TeamRole::Member),
            _ => None,
        }
    }

    /// Whether this role may manage the team (invite/remove members,
    /// manage billing)
    pub fn can_manage_team(&self) -> bool {
        matches!(self, TeamRole::Owner)
    }
}

/// Membership row joining a user to a team
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    /// Unique membership ID
    pub id: i64,

    /// Member's user ID
    pub user_id: i64,

    /// Team ID
    pub team_id: i64,

    /// Role within the team
    pub role: TeamRole,

    /// When the user joined the team
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    /// Adds a user to a team
    ///
    /// Takes any executor so the insert can join sign-up's transaction.
    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        team_id: i64,
        role: TeamRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (user_id, team_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, team_id, role, joined_at
            "#,
        )
        .bind(user_id)
        .bind(team_id)
        .bind(role.as_str())
        .fetch_one(executor)
        .await?;

        Ok(member)
    }

    /// Finds the authoritative membership for a user
    ///
    /// The first row by id wins; users without a team get None. The checkout
    /// reconciler resolves the billed team through this lookup.
    pub async fn find_first_by_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, user_id, team_id, role, joined_at
            FROM team_members
            WHERE user_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Finds a membership by its row ID within a specific team
    ///
    /// Scoped by team so an owner can only address members of their own
    /// team.
    pub async fn find_by_id_in_team(
        pool: &PgPool,
        member_id: i64,
        team_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, user_id, team_id, role, joined_at
            FROM team_members
            WHERE id = $1 AND team_id = $2
            "#,
        )
        .bind(member_id)
        .bind(team_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Lists all members of a team, oldest first
    pub async fn list_by_team(pool: &PgPool, team_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, user_id, team_id, role, joined_at
            FROM team_members
            WHERE team_id = $1
            ORDER BY id
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Removes a membership by its row ID
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, member_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(member_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes all memberships for a user
    ///
    /// Used by account deletion so a soft-deleted user no longer appears in
    /// their team.
    pub async fn delete_by_user(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
