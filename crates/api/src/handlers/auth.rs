//! Handlers for the `/auth` resource (signin, signout).

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use warden_core::error::CoreError;
use warden_core::identity::IdentityProvider;
use warden_core::types::DbId;

use crate::auth::cookie::{
    clear_session_cookie, extract_bearer_token, extract_session_token, session_cookie,
};
use crate::error::{AppError, AppResult};
use crate::middleware::client::ClientInfo;
use crate::middleware::rate_limit::RateLimitDecision;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Successful signin response. The token is also set as the session cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub user_id: DbId,
    pub session_token: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signin
///
/// Exchange a `Bearer` credential from the default identity provider for a session.
pub async fn signin(
    State(state): State<AppState>,
    client: ClientInfo,
    headers: HeaderMap,
) -> AppResult<Response> {
    let provider = state.providers.default_provider();
    signin_with(&state, provider.as_ref(), &headers, &client).await
}

/// POST /api/v1/auth/signin/{provider}
///
/// Same as [`signin`] against a named provider.
pub async fn signin_with_provider(
    State(state): State<AppState>,
    Path(name): Path<String>,
    client: ClientInfo,
    headers: HeaderMap,
) -> AppResult<Response> {
    let provider = state.providers.get(&name).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Identity provider",
            id: name.clone(),
        })
    })?;
    signin_with(&state, provider.as_ref(), &headers, &client).await
}

/// POST /api/v1/auth/signout
///
/// Revoke the session named by the cookie, if any. Always answers 204 and
/// clears the cookie.
pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = state.sessions.signout(&token).await {
            tracing::error!(error = %err, "Failed to revoke session on signout");
        }
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(cookie) = clear_session_cookie(&state.config.cookie) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn signin_with(
    state: &AppState,
    provider: &dyn IdentityProvider,
    headers: &HeaderMap,
    client: &ClientInfo,
) -> AppResult<Response> {
    // 1. Require a bearer credential.
    let credential = extract_bearer_token(headers).ok_or_else(|| {
        CoreError::Validation("Authorization header with a Bearer token is required".into())
    })?;

    // 2. Throttle repeated attempts with the same credential.
    let key = format!("signin:{}:{credential}", provider.name());
    if state.signin_limiter.check(&key) == RateLimitDecision::Limited {
        return Err(AppError::RateLimited);
    }

    // 3. Issue the session.
    let outcome = state.sessions.signin(provider, &credential, client).await?;

    // 4. Hand the token back as a cookie and in the body.
    let cookie = session_cookie(
        &state.config.cookie,
        &outcome.session.id,
        outcome.session.expires_at,
    )
    .map_err(|e| AppError::InternalError(format!("Failed to build session cookie: {e}")))?;

    let body = DataResponse {
        data: SigninResponse {
            user_id: outcome.user_id,
            session_token: outcome.session.id,
        },
    };

    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}
