//! Authentication failure taxonomy.
//!
//! The session lifecycle raises [`AuthError`]; only the HTTP boundary maps
//! these onto status codes. Each variant carries a stable machine-readable
//! code via [`AuthError::code`].

use crate::identity::ProviderError;

pub const INVALID_AUTH_TOKEN: &str = "INVALID_AUTH_TOKEN";
pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
pub const UNABLE_TO_REVOKE_CURRENT_SESSION: &str = "UNABLE_TO_REVOKE_CURRENT_SESSION";
pub const PASSWORD_UPDATE_NOT_ALLOWED: &str = "PASSWORD_UPDATE_NOT_ALLOWED";
pub const PASSWORD_HAS_ALREADY_BEEN_SET: &str = "PASSWORD_HAS_ALREADY_BEEN_SET";
pub const INVALID_CURRENT_PASSWORD: &str = "INVALID_CURRENT_PASSWORD";
pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Why a request failed session validation.
///
/// Only used for logging. Every reason renders the same external response so
/// callers cannot probe which session ids exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No session cookie was presented.
    MissingToken,
    /// The token does not name a non-revoked session.
    UnknownSession,
    /// The session exists but `expires_at` has passed.
    Expired,
    /// The session's user has no link for the active identity provider.
    MissingProviderLink,
}

impl UnauthenticatedReason {
    /// Whether the client should be told to drop its session cookie.
    pub fn clears_cookie(self) -> bool {
        matches!(self, Self::UnknownSession | Self::Expired)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired authentication token")]
    InvalidCredential,

    #[error("Authentication required")]
    Unauthenticated(UnauthenticatedReason),

    #[error("Unable to revoke current session, use signout instead")]
    ForbiddenSelfRevoke,

    #[error("Password update is not allowed")]
    NotAllowed,

    #[error("Password has already been set")]
    AlreadySet,

    #[error("Current password is invalid")]
    InvalidCurrentPassword,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Identity provider failure: {0}")]
    Provider(#[from] ProviderError),
}

impl AuthError {
    /// Stable code rendered in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => INVALID_AUTH_TOKEN,
            Self::Unauthenticated(_) => UNAUTHENTICATED,
            Self::ForbiddenSelfRevoke => UNABLE_TO_REVOKE_CURRENT_SESSION,
            Self::NotAllowed => PASSWORD_UPDATE_NOT_ALLOWED,
            Self::AlreadySet => PASSWORD_HAS_ALREADY_BEEN_SET,
            Self::InvalidCurrentPassword => INVALID_CURRENT_PASSWORD,
            Self::SessionNotFound => SESSION_NOT_FOUND,
            Self::Provider(_) => INTERNAL_ERROR,
        }
    }

    /// True for failures that are the server's fault rather than the client's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}
