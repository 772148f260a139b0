pub mod auth;
pub mod health;
pub mod sessions;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signin                     signin with the default provider (public)
/// /auth/signin/{provider}          signin with a named provider (public)
/// /auth/signout                    revoke the cookie's session (public)
///
/// /sessions                        list own active sessions (auth required)
/// /sessions/{session_id}           revoke another own session (DELETE)
///
/// /users                           list users with activity (GET)
/// /users/me                        get, update own profile (GET, PATCH)
/// /users/stats                     signup and session counts (GET)
/// /users/password                  status, set, change (GET, POST, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .nest("/users", users::router())
}
