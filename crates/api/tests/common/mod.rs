#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use warden_api::auth::cookie::{CookiePolicy, SESSION_COOKIE_NAME};
use warden_api::config::{Environment, RateLimitConfig, ServerConfig};
use warden_api::router::build_app_router;
use warden_api::state::AppState;
use warden_core::identity::{IdentityProvider, ProviderError, ProviderRegistry, ProviderUser};
use warden_core::session::SessionPolicy;

pub const FAKE_PROVIDER: &str = "fake";

// ---------------------------------------------------------------------------
// Identity provider double
// ---------------------------------------------------------------------------

/// In-memory identity provider. Credentials map to external user ids, and
/// profiles and passwords are keyed by external id.
///
/// Each call family can be given a latency to exercise provider timeouts.
pub struct FakeProvider {
    allow_password: bool,
    verify_delay: Duration,
    profile_delay: Duration,
    password_delay: Duration,
    tokens: Mutex<HashMap<String, String>>,
    users: Mutex<HashMap<String, ProviderUser>>,
    passwords: Mutex<HashMap<String, String>>,
    pub profile_fetches: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            allow_password: true,
            verify_delay: Duration::ZERO,
            profile_delay: Duration::ZERO,
            password_delay: Duration::ZERO,
            tokens: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            passwords: Mutex::new(HashMap::new()),
            profile_fetches: AtomicUsize::new(0),
        }
    }

    pub fn without_passwords(mut self) -> Self {
        self.allow_password = false;
        self
    }

    /// Delay every token verification by `delay`.
    pub fn slow_verify(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    /// Delay every profile fetch by `delay`.
    pub fn slow_profile(mut self, delay: Duration) -> Self {
        self.profile_delay = delay;
        self
    }

    /// Delay every password check and update by `delay`.
    pub fn slow_passwords(mut self, delay: Duration) -> Self {
        self.password_delay = delay;
        self
    }

    /// Accept `credential` as a token for `user`.
    pub fn with_user(self, credential: &str, user: ProviderUser) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(credential.to_string(), user.id.clone());
        self.users.lock().unwrap().insert(user.id.clone(), user);
        self
    }

    /// Give the provider account `external_id` an existing password.
    pub fn with_password(self, external_id: &str, password: &str) -> Self {
        self.passwords
            .lock()
            .unwrap()
            .insert(external_id.to_string(), password.to_string());
        self
    }

    pub fn password_of(&self, external_id: &str) -> Option<String> {
        self.passwords.lock().unwrap().get(external_id).cloned()
    }

    pub fn profile_fetch_count(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &str {
        FAKE_PROVIDER
    }

    fn allow_password(&self) -> bool {
        self.allow_password
    }

    async fn verify_token(&self, token: &str) -> Option<String> {
        latency(self.verify_delay).await;
        self.tokens.lock().unwrap().get(token).cloned()
    }

    async fn get_provider_user(&self, external_id: &str) -> Option<ProviderUser> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        latency(self.profile_delay).await;
        self.users.lock().unwrap().get(external_id).cloned()
    }

    async fn verify_password(
        &self,
        external_id: &str,
        password: &str,
    ) -> Result<bool, ProviderError> {
        latency(self.password_delay).await;
        Ok(self
            .passwords
            .lock()
            .unwrap()
            .get(external_id)
            .is_some_and(|stored| stored == password))
    }

    async fn update_password(&self, external_id: &str, password: &str) -> Result<(), ProviderError> {
        latency(self.password_delay).await;
        self.passwords
            .lock()
            .unwrap()
            .insert(external_id.to_string(), password.to_string());
        Ok(())
    }
}

async fn latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Provider profile with a password-less account.
pub fn provider_user(external_id: &str, email: &str, name: &str) -> ProviderUser {
    ProviderUser {
        id: external_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        password_enabled: false,
    }
}

/// Provider knowing `alice` (credential `token-alice`) and `bob` (`token-bob`).
pub fn default_provider() -> FakeProvider {
    FakeProvider::new()
        .with_user(
            "token-alice",
            provider_user("ext_alice", "alice@example.com", "Alice"),
        )
        .with_user("token-bob", provider_user("ext_bob", "bob@example.com", "Bob"))
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Rate limits are generous so they only trigger in tests that lower them.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: Environment::Test,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session: SessionPolicy::default(),
        cookie: CookiePolicy::for_environment(Environment::Test),
        signin_rate_limit: RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 1_000,
        },
        private_rate_limit: RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 1_000,
        },
        auth_provider: FAKE_PROVIDER.to_string(),
        provider_timeout: Duration::from_secs(5),
        clerk: None,
    }
}

/// `test_config` with a provider timeout short enough to trip in tests.
pub fn short_timeout_config() -> ServerConfig {
    ServerConfig {
        provider_timeout: Duration::from_millis(50),
        ..test_config()
    }
}

/// Build the full application router against the default fake provider.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config(), Arc::new(default_provider()))
}

/// Build the full application router with the same middleware stack the
/// binary uses.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig, provider: Arc<FakeProvider>) -> Router {
    let providers = ProviderRegistry::new(provider);
    build_app_router(AppState::new(pool, config, providers))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Request with the given session cookie header value (`warden_sid=...`).
pub async fn request_with_cookie(
    app: Router,
    method: Method,
    uri: &str,
    cookie: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response<Body> {
    request_with_cookie(app, Method::GET, uri, cookie).await
}

/// JSON request with the given session cookie.
pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    cookie: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookie)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST /api/v1/auth/signin with `credential` as the bearer token.
pub async fn signin(app: Router, credential: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/signin")
        .header(AUTHORIZATION, format!("Bearer {credential}"))
        .header("x-forwarded-for", "203.0.113.7")
        .header("user-agent", "warden-tests")
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Sign in and return the `warden_sid=<token>` cookie pair.
pub async fn signin_cookie(app: Router, credential: &str) -> String {
    let response = signin(app, credential).await;
    assert_eq!(response.status(), 200, "signin with {credential} failed");
    session_cookie_from(&response).expect("signin response sets the session cookie")
}

/// The `name=value` pair of the session `Set-Cookie` header, if any.
pub fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&prefix))
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .next()
}

/// Session token carried by a `warden_sid=<token>` cookie pair.
pub fn token_of(cookie: &str) -> &str {
    cookie
        .strip_prefix(&format!("{SESSION_COOKIE_NAME}="))
        .unwrap_or(cookie)
}

/// Whether the response instructs the client to drop the session cookie.
pub fn clears_session_cookie(response: &Response<Body>) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{SESSION_COOKIE_NAME}=;")) && v.contains("Max-Age=0"))
}

/// Collect the response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
