//! Identity provider link model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// A row from the `user_providers` table binding a user to one provider account.
#[derive(Debug, Clone, FromRow)]
pub struct UserProvider {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub external_id: String,
    pub password_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for linking a user to a provider account.
#[derive(Debug, Clone)]
pub struct CreateUserProvider {
    pub user_id: DbId,
    pub provider: String,
    pub external_id: String,
    pub password_enabled: bool,
}
