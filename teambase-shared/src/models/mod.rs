/// Database models for Teambase
///
/// Each model exposes a typed repository of named operations
/// (`find_active_by_id`, `update_billing`, ...) so the persistence contract
/// is checked at compile time rather than through stringly-typed query
/// builders.
///
/// # Models
///
/// - `user`: accounts with soft-delete lifecycle
/// - `team`: billing-granularity groups with Stripe state
/// - `team_member`: user ↔ team join rows with roles
/// - `invitation`: pending/accepted membership offers
/// - `activity_log`: append-only audit trail

pub mod activity_log;
pub mod invitation;
pub mod team;
pub mod team_member;
pub mod user;
