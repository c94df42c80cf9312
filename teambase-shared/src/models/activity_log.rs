/// Activity log model and database operations
///
/// Append-only audit trail of user-visible actions. The core only ever
/// writes logs; they are read back solely for display (recent first, limited).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activity_logs (
///     id BIGSERIAL PRIMARY KEY,
///     team_id BIGINT NOT NULL REFERENCES teams(id),
///     user_id BIGINT REFERENCES users(id),
///     action TEXT NOT NULL,
///     timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     ip_address VARCHAR(45)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Actions recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    SignUp,
    SignIn,
    SignOut,
    UpdatePassword,
    DeleteAccount,
    UpdateAccount,
    CreateTeam,
    RemoveTeamMember,
    InviteTeamMember,
    AcceptInvitation,
}

impl ActivityAction {
    /// Converts the action to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::SignUp => "SIGN_UP",
            ActivityAction::SignIn => "SIGN_IN",
            ActivityAction::SignOut => "SIGN_OUT",
            ActivityAction::UpdatePassword => "UPDATE_PASSWORD",
            ActivityAction::DeleteAccount => "DELETE_ACCOUNT",
            ActivityAction::UpdateAccount => "UPDATE_ACCOUNT",
            ActivityAction::CreateTeam => "CREATE_TEAM",
            ActivityAction::RemoveTeamMember => "REMOVE_TEAM_MEMBER",
            ActivityAction::InviteTeamMember => "INVITE_TEAM_MEMBER",
            ActivityAction::AcceptInvitation => "ACCEPT_INVITATION",
        }
    }
}

/// Activity log row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    /// Unique log ID
    pub id: i64,

    /// Team the action happened in
    pub team_id: i64,

    /// Acting user (None once the user row is gone)
    pub user_id: Option<i64>,

    /// Action name (see [`ActivityAction`])
    pub action: String,

    /// When the action happened
    pub timestamp: DateTime<Utc>,

    /// Client IP address, when known
    pub ip_address: Option<String>,
}

impl ActivityLog {
    /// Appends an activity log entry
    ///
    /// Log writes are best-effort from the caller's perspective: handlers
    /// propagate failures like any other database error, but never read the
    /// entry back. Takes any executor so entries can join an enclosing
    /// transaction.
    pub async fn record<'e, E>(
        executor: E,
        team_id: i64,
        user_id: i64,
        action: ActivityAction,
        ip_address: Option<&str>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (team_id, user_id, action, ip_address)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(action.as_str())
        .bind(ip_address)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Lists a user's recent activity, newest first
    pub async fn list_recent_for_user(
        pool: &PgPool,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, team_id, user_id, action, timestamp, ip_address
            FROM activity_logs
            WHERE user_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(ActivityAction::SignUp.as_str(), "SIGN_UP");
        assert_eq!(ActivityAction::CreateTeam.as_str(), "CREATE_TEAM");
        assert_eq!(
            ActivityAction::AcceptInvitation.as_str(),
            "ACCEPT_INVITATION"
        );
    }

    #[test]
    fn test_action_serde_matches_stored_form() {
        for action in [
            ActivityAction::SignUp,
            ActivityAction::SignIn,
            ActivityAction::SignOut,
            ActivityAction::UpdatePassword,
            ActivityAction::DeleteAccount,
            ActivityAction::UpdateAccount,
            ActivityAction::CreateTeam,
            ActivityAction::RemoveTeamMember,
            ActivityAction::InviteTeamMember,
            ActivityAction::AcceptInvitation,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }
}
