//! Session token generation and lifetime policy.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::types::{DbId, Timestamp};

/// Random bytes per session token (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest accepted session lifetime: 10 years.
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Default cap on concurrently active sessions per user.
pub const DEFAULT_MAX_ACTIVE_SESSIONS: i64 = 5;

/// Generate an opaque session token from the thread-local CSPRNG.
///
/// The token is the session's primary key and is returned to the client in
/// the session cookie. Encoded as lowercase hex.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lifetime and per-user cap applied to every new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub max_active_sessions: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            max_active_sessions: DEFAULT_MAX_ACTIVE_SESSIONS,
        }
    }
}

impl SessionPolicy {
    /// Expiry for a session created at `now`, saturating at the latest
    /// representable instant.
    pub fn expires_at(&self, now: Timestamp) -> Timestamp {
        now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// How many sessions must be evicted when a user has `active` sessions.
    pub fn excess(&self, active: i64) -> i64 {
        (active - self.max_active_sessions).max(0)
    }
}

/// A session has expired once `expires_at` lies strictly in the past.
pub fn is_expired(expires_at: Timestamp, now: Timestamp) -> bool {
    expires_at < now
}

/// The authenticated principal attached to a request after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: DbId,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn tokens_are_hex_and_long_enough() {
        let token = generate_session_token();
        assert_eq!(token.len(), SESSION_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn expiry_adds_ttl() {
        let policy = SessionPolicy {
            ttl: Duration::hours(2),
            max_active_sessions: 3,
        };
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(
            policy.expires_at(now),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let policy = SessionPolicy {
            ttl: Duration::seconds(10_000_000_000_000),
            max_active_sessions: 1,
        };
        assert_eq!(policy.expires_at(Utc::now()), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn excess_is_never_negative() {
        let policy = SessionPolicy {
            ttl: Duration::days(1),
            max_active_sessions: 2,
        };
        assert_eq!(policy.excess(0), 0);
        assert_eq!(policy.excess(2), 0);
        assert_eq!(policy.excess(3), 1);
        assert_eq!(policy.excess(5), 3);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert!(!is_expired(now, now));
        assert!(is_expired(now - Duration::seconds(1), now));
        assert!(!is_expired(now + Duration::seconds(1), now));
    }

    #[test]
    fn default_policy_is_one_week_five_sessions() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.ttl, Duration::days(7));
        assert_eq!(policy.max_active_sessions, 5);
    }
}
