//! Repository for the `sessions` table.
//!
//! "Active" means `is_revoked = false AND expires_at >= NOW()` throughout.

use sqlx::{PgConnection, PgExecutor};
use warden_core::session::{generate_session_token, SessionPolicy};
use warden_core::types::DbId;

use crate::models::session::{ActiveSession, CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, ip_address, user_agent, is_revoked, \
                       last_active_at, expires_at, created_at, updated_at";

/// Provides persistence operations for user sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new active session with a freshly generated token id.
    pub async fn create<'e, E>(executor: E, input: &CreateSession) -> Result<Session, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO sessions (id, user_id, ip_address, user_agent, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(generate_session_token())
            .bind(input.user_id)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Create a session and enforce the per-user active session cap.
    ///
    /// Must run inside the caller's transaction. The user row is locked first
    /// so concurrent signins for the same user serialise on the count and
    /// eviction. Returns the new session and the ids of any evicted sessions,
    /// least recently active first. The new session is never evicted.
    pub async fn create_with_eviction(
        conn: &mut PgConnection,
        input: &CreateSession,
        policy: &SessionPolicy,
    ) -> Result<(Session, Vec<String>), sqlx::Error> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(input.user_id)
            .execute(&mut *conn)
            .await?;

        let session = Self::create(&mut *conn, input).await?;

        let active = Self::count_active(&mut *conn, input.user_id).await?;
        let excess = policy.excess(active);

        let mut evicted = Vec::new();
        for _ in 0..excess {
            let Some(oldest) =
                Self::find_oldest_active(&mut *conn, input.user_id, Some(&session.id)).await?
            else {
                break;
            };
            if Self::revoke(&mut *conn, &oldest.id).await? {
                evicted.push(oldest.id);
            }
        }

        Ok((session, evicted))
    }

    /// Find a non-revoked session by id.
    ///
    /// Expiry is deliberately not filtered so callers can tell an expired
    /// session apart from a revoked or unknown one.
    pub async fn find_active<'e, E>(executor: E, id: &str) -> Result<Option<Session>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1 AND is_revoked = false");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Set `last_active_at` to now. A missing id is a no-op.
    pub async fn touch<'e, E>(executor: E, id: &str) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE sessions SET last_active_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Revoke a session if it is currently active. Returns `true` if the row was updated.
    pub async fn revoke<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE sessions SET is_revoked = true
             WHERE id = $1 AND is_revoked = false AND expires_at >= NOW()",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke an active session only if it belongs to `user_id`.
    ///
    /// Returns `false` for sessions that do not exist, belong to someone else,
    /// or are already inactive.
    pub async fn revoke_owned<'e, E>(
        executor: E,
        user_id: DbId,
        id: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE sessions SET is_revoked = true
             WHERE id = $1 AND user_id = $2 AND is_revoked = false AND expires_at >= NOW()",
        )
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active sessions for a user.
    pub async fn count_active<'e, E>(executor: E, user_id: DbId) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions
             WHERE user_id = $1 AND is_revoked = false AND expires_at >= NOW()",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// List a user's active sessions, most recent signin first.
    ///
    /// `current_id` marks the caller's own session in the result.
    pub async fn list_active<'e, E>(
        executor: E,
        user_id: DbId,
        current_id: &str,
    ) -> Result<Vec<ActiveSession>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ActiveSession>(
            "SELECT id, ip_address, user_agent, last_active_at, created_at, expires_at,
                    (id = $2) AS is_current
             FROM sessions
             WHERE user_id = $1 AND is_revoked = false AND expires_at >= NOW()
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(current_id)
        .fetch_all(executor)
        .await
    }

    /// The active session with the smallest `last_active_at`: the eviction candidate.
    ///
    /// `exclude` skips one session id (the one just created during signin).
    pub async fn find_oldest_active<'e, E>(
        executor: E,
        user_id: DbId,
        exclude: Option<&str>,
    ) -> Result<Option<Session>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1 AND is_revoked = false AND expires_at >= NOW()
               AND ($2::TEXT IS NULL OR id <> $2)
             ORDER BY last_active_at ASC, created_at ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(exclude)
            .fetch_optional(executor)
            .await
    }
}
