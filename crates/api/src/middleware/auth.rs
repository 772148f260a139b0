//! Session cookie authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use warden_core::auth::AuthError;
use warden_core::session::SessionContext;

use crate::auth::cookie::{clear_session_cookie, extract_session_token};
use crate::auth::lifecycle::LifecycleError;
use crate::error::AppError;
use crate::middleware::rate_limit::RateLimitDecision;
use crate::state::AppState;

/// Authenticated session resolved from the session cookie.
///
/// Use this as an extractor parameter in any handler that requires authentication:
///
/// ```ignore
/// async fn my_handler(AuthSession(ctx): AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(user_id = ctx.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
///
/// Rejections are a uniform 401. When the presented cookie names a session
/// that is unknown, revoked or expired, the response also clears the cookie.
/// Accepted requests count against the per-user private rate limit.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionContext);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved by an earlier extractor on this request.
        if let Some(ctx) = parts.extensions.get::<SessionContext>() {
            return Ok(Self(ctx.clone()));
        }

        let token = extract_session_token(&parts.headers);
        let ctx = match state.sessions.validate(token.as_deref()).await {
            Ok(ctx) => ctx,
            Err(LifecycleError::Auth(AuthError::Unauthenticated(reason))) => {
                tracing::debug!(?reason, "Session rejected");
                let clear_cookie = if reason.clears_cookie() {
                    clear_session_cookie(&state.config.cookie).ok()
                } else {
                    None
                };
                return Err(AppError::SessionRejected { clear_cookie });
            }
            Err(err) => return Err(err.into()),
        };

        let key = format!("user:{}", ctx.user_id);
        if state.private_limiter.check(&key) == RateLimitDecision::Limited {
            tracing::debug!(user_id = ctx.user_id, "Private rate limit exceeded");
            return Err(AppError::RateLimited);
        }

        parts.extensions.insert(ctx.clone());
        Ok(Self(ctx))
    }
}
