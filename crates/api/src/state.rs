use std::sync::Arc;

use warden_core::identity::ProviderRegistry;

use crate::auth::lifecycle::SessionManager;
use crate::config::ServerConfig;
use crate::middleware::rate_limit::{FixedWindowLimiter, RateLimiter};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: warden_db::DbPool,
    /// Immutable server configuration.
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionManager>,
    /// Identity providers keyed by name.
    pub providers: Arc<ProviderRegistry>,
    /// Budget for signin attempts, keyed by presented credential.
    pub signin_limiter: Arc<dyn RateLimiter>,
    /// Budget for authenticated requests, keyed by user.
    pub private_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(pool: warden_db::DbPool, config: ServerConfig, providers: ProviderRegistry) -> Self {
        let sessions = SessionManager::new(pool.clone(), config.session, config.provider_timeout);
        let signin_limiter = FixedWindowLimiter::new(config.signin_rate_limit);
        let private_limiter = FixedWindowLimiter::new(config.private_rate_limit);

        Self {
            pool,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            providers: Arc::new(providers),
            signin_limiter: Arc::new(signin_limiter),
            private_limiter: Arc::new(private_limiter),
        }
    }
}
