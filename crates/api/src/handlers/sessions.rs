//! Handlers for the `/sessions` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use warden_db::models::session::ActiveSession;

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::response::DataResponse;
use crate::state::AppState;

/// One active session as shown to its owner. Timestamps are Unix milliseconds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub last_active_at: i64,
    pub login_date: i64,
    pub expires_at: i64,
    pub is_current_session: bool,
}

impl From<ActiveSession> for SessionResponse {
    fn from(session: ActiveSession) -> Self {
        Self {
            id: session.id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            last_active_at: session.last_active_at.timestamp_millis(),
            login_date: session.created_at.timestamp_millis(),
            expires_at: session.expires_at.timestamp_millis(),
            is_current_session: session.is_current,
        }
    }
}

/// GET /api/v1/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
) -> AppResult<Json<DataResponse<Vec<SessionResponse>>>> {
    let sessions = state.sessions.list_sessions(&ctx).await?;
    Ok(Json(DataResponse {
        data: sessions.into_iter().map(SessionResponse::from).collect(),
    }))
}

/// DELETE /api/v1/sessions/{session_id}
///
/// Revoke one of the caller's other sessions. The current session must use signout.
pub async fn revoke_session(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
    Path(session_id): Path<String>,
) -> AppResult<StatusCode> {
    state.sessions.revoke_session(&ctx, &session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
