//! Route definitions for the `/sessions` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`. All require an authenticated session.
///
/// ```text
/// GET    /               -> list_sessions
/// DELETE /{session_id}   -> revoke_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list_sessions))
        .route("/{session_id}", delete(sessions::revoke_session))
}
