//! Repository for the `users` table.

use sqlx::PgExecutor;
use warden_core::types::{DbId, Timestamp};

use crate::models::user::{UpsertUser, User, UserActivity, UserStats};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, name, created_at, updated_at";

/// Provides persistence operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user, or refresh the name of the existing user with the same email.
    ///
    /// Email is the merge key: two provider accounts sharing an email resolve
    /// to one local user.
    pub async fn upsert_by_email<'e, E>(executor: E, input: &UpsertUser) -> Result<User, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO users (email, name)
             VALUES ($1, $2)
             ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.name)
            .fetch_one(executor)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Set a user's display name. Returns `None` if no row with `id` exists.
    pub async fn update_name<'e, E>(
        executor: E,
        id: DbId,
        name: &str,
    ) -> Result<Option<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("UPDATE users SET name = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// One page of users with their session activity, newest sign-up first.
    pub async fn list_with_activity<'e, E>(
        executor: E,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserActivity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserActivity>(
            "SELECT u.id, u.name, u.created_at,
                    COUNT(s.id) AS total_login_count,
                    MAX(s.last_active_at) AS last_active_at
             FROM users u
             LEFT JOIN sessions s ON s.user_id = u.id
             GROUP BY u.id
             ORDER BY u.created_at DESC, u.id DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    /// Total number of users.
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }

    /// Aggregate counters for the dashboard.
    ///
    /// Session counters only include sessions still active at query time,
    /// bucketed by creation since `today_start` and `week_start`.
    pub async fn stats<'e, E>(
        executor: E,
        today_start: Timestamp,
        week_start: Timestamp,
    ) -> Result<UserStats, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserStats>(
            "SELECT
                (SELECT COUNT(*) FROM users) AS user_sign_ups,
                (SELECT COUNT(*) FROM sessions
                 WHERE created_at >= $1 AND is_revoked = false AND expires_at >= NOW())
                    AS active_sessions_today,
                (SELECT COUNT(*) FROM sessions
                 WHERE created_at >= $2 AND is_revoked = false AND expires_at >= NOW())
                    AS active_sessions_last_7_days",
        )
        .bind(today_start)
        .bind(week_start)
        .fetch_one(executor)
        .await
    }
}
