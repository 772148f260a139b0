//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`. All require an authenticated session.
///
/// ```text
/// GET   /           -> list_users
/// GET   /me         -> get_me
/// PATCH /me         -> update_me
/// GET   /stats      -> user_stats
/// GET   /password   -> password_status
/// POST  /password   -> set_password
/// PUT   /password   -> change_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/me", get(users::get_me).patch(users::update_me))
        .route("/stats", get(users::user_stats))
        .route(
            "/password",
            get(users::password_status)
                .post(users::set_password)
                .put(users::change_password),
        )
}
