use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use warden_core::auth::{AuthError, INTERNAL_ERROR, UNAUTHENTICATED};
use warden_core::error::CoreError;

use crate::auth::lifecycle::LifecycleError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`AuthError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `warden_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An authentication or session lifecycle failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Too many requests")]
    RateLimited,

    /// The request's session was rejected. `clear_cookie` is sent as
    /// `Set-Cookie` when the client holds a cookie that can never succeed.
    #[error("Authentication required")]
    SessionRejected { clear_cookie: Option<HeaderValue> },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Auth(auth) => Self::Auth(auth),
            LifecycleError::Database(db) => Self::Database(db),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, VALIDATION_ERROR, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Auth / lifecycle errors ---
            AppError::Auth(auth) => {
                let status = match auth {
                    AuthError::InvalidCredential | AuthError::Unauthenticated(_) => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthError::ForbiddenSelfRevoke
                    | AuthError::AlreadySet
                    | AuthError::InvalidCurrentPassword => StatusCode::BAD_REQUEST,
                    AuthError::NotAllowed => StatusCode::FORBIDDEN,
                    AuthError::SessionNotFound => StatusCode::NOT_FOUND,
                    AuthError::Provider(err) => {
                        tracing::error!(error = %err, "Identity provider error");
                        return internal();
                    }
                };
                (status, auth.code(), auth.to_string())
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
            AppError::SessionRejected { .. } => (
                StatusCode::UNAUTHORIZED,
                UNAUTHENTICATED,
                "Authentication required".to_string(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::SessionRejected {
            clear_cookie: Some(cookie),
        } = self
        {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        response
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR,
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
