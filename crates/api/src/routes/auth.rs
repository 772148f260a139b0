//! Route definitions for the `/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signin             -> signin
/// POST /signin/{provider}  -> signin_with_provider
/// POST /signout            -> signout
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", post(auth::signin))
        .route("/signin/{provider}", post(auth::signin_with_provider))
        .route("/signout", post(auth::signout))
}
