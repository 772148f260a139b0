//! Session model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// A row from the `sessions` table.
///
/// `id` is the bearer token carried by the session cookie. Never log it.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: DbId,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub is_revoked: bool,
    pub last_active_at: Timestamp,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new session. The id is generated by the repository.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub expires_at: Timestamp,
}

/// An active session as listed to its owner.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSession {
    pub id: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub last_active_at: Timestamp,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    /// Whether this is the session making the listing request.
    pub is_current: bool,
}
