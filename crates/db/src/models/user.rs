//! User entity model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a user, or refreshing the existing row with the same email.
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub email: String,
    pub name: String,
}

/// A user with aggregate session activity, for the admin listing.
#[derive(Debug, Clone, FromRow)]
pub struct UserActivity {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    /// Every session ever issued to the user, revoked or not.
    pub total_login_count: i64,
    pub last_active_at: Option<Timestamp>,
}

/// Sign-up and session counters for the stats endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct UserStats {
    pub user_sign_ups: i64,
    pub active_sessions_today: i64,
    pub active_sessions_last_7_days: i64,
}
