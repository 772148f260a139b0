//! Repository for the `user_providers` table.

use sqlx::PgExecutor;
use warden_core::types::DbId;

use crate::models::user_provider::{CreateUserProvider, UserProvider};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, provider, external_id, password_enabled, created_at, updated_at";

/// Provides persistence operations for identity provider links.
pub struct UserProviderRepo;

impl UserProviderRepo {
    /// Link a user to a provider account.
    ///
    /// If the `(provider, external_id)` pair is already linked, the existing
    /// row is kept (including its `user_id`) and only `password_enabled` is
    /// refreshed.
    pub async fn link<'e, E>(
        executor: E,
        input: &CreateUserProvider,
    ) -> Result<UserProvider, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO user_providers (user_id, provider, external_id, password_enabled)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (provider, external_id)
                DO UPDATE SET password_enabled = EXCLUDED.password_enabled
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProvider>(&query)
            .bind(input.user_id)
            .bind(&input.provider)
            .bind(&input.external_id)
            .bind(input.password_enabled)
            .fetch_one(executor)
            .await
    }

    /// Find the link for a provider account.
    pub async fn find_by_external_id<'e, E>(
        executor: E,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<UserProvider>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM user_providers WHERE provider = $1 AND external_id = $2"
        );
        sqlx::query_as::<_, UserProvider>(&query)
            .bind(provider)
            .bind(external_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user's link for one provider, oldest first if several exist.
    pub async fn find_for_user<'e, E>(
        executor: E,
        user_id: DbId,
        provider: &str,
    ) -> Result<Option<UserProvider>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM user_providers
             WHERE user_id = $1 AND provider = $2
             ORDER BY created_at ASC, id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, UserProvider>(&query)
            .bind(user_id)
            .bind(provider)
            .fetch_optional(executor)
            .await
    }

    /// Record whether the provider account has a password. Returns `true` if the row exists.
    pub async fn set_password_enabled<'e, E>(
        executor: E,
        id: DbId,
        enabled: bool,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE user_providers SET password_enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
