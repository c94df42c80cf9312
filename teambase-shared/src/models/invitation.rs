/// Invitation model and database operations
///
/// Invitations let a team owner offer membership to an email address. An
/// invitation transitions pending → accepted exactly once, and only when a
/// sign-up arrives carrying the invitation id AND a matching email.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invitations (
///     id BIGSERIAL PRIMARY KEY,
///     team_id BIGINT NOT NULL REFERENCES teams(id),
///     email VARCHAR(255) NOT NULL,
///     role VARCHAR(50) NOT NULL,
///     invited_by BIGINT NOT NULL REFERENCES users(id),
///     invited_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     status VARCHAR(20) NOT NULL DEFAULT 'pending'
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

use super::team_member::TeamRole;

/// Status of an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Awaiting a matching sign-up
    Pending,

    /// Consumed by a sign-up; cannot be used again
    Accepted,
}

impl InvitationStatus {
    /// Converts status to string for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }
}

/// Invitation row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    /// Unique invitation ID (carried by the sign-up link)
    pub id: i64,

    /// Team the invitee would join
    pub team_id: i64,

    /// Email address the invitation was sent to
    pub email: String,

    /// Role granted on acceptance
    pub role: TeamRole,

    /// User who sent the invitation
    pub invited_by: i64,

    /// When the invitation was sent
    pub invited_at: DateTime<Utc>,

    /// Current status
    pub status: InvitationStatus,
}

impl Invitation {
    /// Creates a pending invitation
    pub async fn create(
        pool: &PgPool,
        team_id: i64,
        email: &str,
        role: TeamRole,
        invited_by: i64,
    ) -> Result<Self, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (team_id, email, role, invited_by, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING id, team_id, email, role, invited_by, invited_at, status
            "#,
        )
        .bind(team_id)
        .bind(email)
        .bind(role.as_str())
        .bind(invited_by)
        .fetch_one(pool)
        .await?;

        Ok(invitation)
    }

    /// Finds a pending invitation matching both id and email
    ///
    /// An accepted invitation, a wrong email, or an unknown id all return
    /// None; the caller surfaces a single "invalid or expired invitation"
    /// message without distinguishing the cases.
    pub async fn find_pending(
        pool: &PgPool,
        id: i64,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, team_id, email, role, invited_by, invited_at, status
            FROM invitations
            WHERE id = $1 AND email = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Checks whether a pending invitation already exists for an email on a
    /// team
    ///
    /// Used to reject duplicate invites before inserting a new row.
    pub async fn pending_exists(
        pool: &PgPool,
        team_id: i64,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM invitations
            WHERE team_id = $1 AND email = $2 AND status = 'pending'
            "#,
        )
        .bind(team_id)
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Marks an invitation accepted
    ///
    /// The `status = 'pending'` guard makes the transition single-shot: a
    /// second acceptance attempt updates zero rows and returns false. Takes
    /// any executor so the update can join sign-up's transaction.
    pub async fn mark_accepted<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET status = 'accepted'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
