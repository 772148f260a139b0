use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use warden_core::session::{
    SessionPolicy, DEFAULT_MAX_ACTIVE_SESSIONS, DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS,
};

use crate::auth::cookie::CookiePolicy;

/// Failure while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// A fixed-window request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

/// Credentials and endpoints for the Clerk identity provider.
#[derive(Clone)]
pub struct ClerkConfig {
    /// Backend API secret (`sk_...`).
    pub secret_key: String,
    /// PEM-encoded RSA public key used to verify session JWTs.
    pub jwks_public_key: String,
    /// Accepted `azp` claim values. Empty means any.
    pub authorized_parties: Vec<String>,
    /// Backend API base URL without a trailing slash.
    pub api_url: String,
}

impl std::fmt::Debug for ClerkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkConfig")
            .field("secret_key", &"<redacted>")
            .field("authorized_parties", &self.authorized_parties)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Server configuration loaded from environment variables.
///
/// Built once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    pub environment: Environment,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Session lifetime and per-user active session cap.
    pub session: SessionPolicy,
    pub cookie: CookiePolicy,
    /// Budget for `POST /auth/signin`, keyed by credential.
    pub signin_rate_limit: RateLimitConfig,
    /// Budget for authenticated routes, keyed by user.
    pub private_rate_limit: RateLimitConfig,
    /// Name of the default identity provider.
    pub auth_provider: String,
    /// Upper bound on any single identity provider call.
    pub provider_timeout: Duration,
    pub clerk: Option<ClerkConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                     |
    /// |-----------------------------------|-----------------------------|
    /// | `HOST`                            | `0.0.0.0`                   |
    /// | `PORT`                            | `3000`                      |
    /// | `APP_ENV`                         | `development`               |
    /// | `CORS_ORIGINS`                    | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`            | `30`                        |
    /// | `SESSION_TTL_SECS`                | `604800`                    |
    /// | `MAX_USER_ACTIVE_SESSIONS`        | `5`                         |
    /// | `PRIVATE_RATE_LIMIT_WINDOW_MS`    | `60000`                     |
    /// | `PRIVATE_RATE_LIMIT_MAX_REQUESTS` | `100`                       |
    /// | `SIGNIN_RATE_LIMIT_WINDOW_MS`     | `1000`                      |
    /// | `SIGNIN_RATE_LIMIT_MAX_REQUESTS`  | `10`                        |
    /// | `AUTH_PROVIDER`                   | `clerk`                     |
    /// | `PROVIDER_TIMEOUT_SECS`           | `5`                         |
    /// | `CLERK_SECRET_KEY`                | required for `clerk`        |
    /// | `CLERK_JWKS_PUBLIC_KEY`           | required for `clerk`        |
    /// | `CLERK_AUTHORIZED_PARTIES`        | empty                       |
    /// | `CLERK_API_URL`                   | `https://api.clerk.com/v1`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "PORT", 3000)?;
        let environment: Environment = parse_or(&var, "APP_ENV", Environment::Development)?;

        let cors_origins = split_list(
            &var("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;

        let ttl_secs: i64 = parse_or(&var, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(invalid("SESSION_TTL_SECS", "must be positive"));
        }
        if ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(invalid(
                "SESSION_TTL_SECS",
                format!("must be at most {MAX_SESSION_TTL_SECS}"),
            ));
        }
        let max_active_sessions: i64 =
            parse_or(&var, "MAX_USER_ACTIVE_SESSIONS", DEFAULT_MAX_ACTIVE_SESSIONS)?;
        if max_active_sessions < 1 {
            return Err(invalid("MAX_USER_ACTIVE_SESSIONS", "must be at least 1"));
        }

        let private_rate_limit = rate_limit(
            &var,
            "PRIVATE_RATE_LIMIT_WINDOW_MS",
            60_000,
            "PRIVATE_RATE_LIMIT_MAX_REQUESTS",
            100,
        )?;
        let signin_rate_limit = rate_limit(
            &var,
            "SIGNIN_RATE_LIMIT_WINDOW_MS",
            1_000,
            "SIGNIN_RATE_LIMIT_MAX_REQUESTS",
            10,
        )?;

        let auth_provider = var("AUTH_PROVIDER")
            .map(|p| p.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "clerk".into());
        let provider_timeout_secs: u64 = parse_or(&var, "PROVIDER_TIMEOUT_SECS", 5)?;

        let clerk = match (var("CLERK_SECRET_KEY"), var("CLERK_JWKS_PUBLIC_KEY")) {
            (Some(secret_key), Some(public_key)) => Some(ClerkConfig {
                secret_key,
                // PEMs in `.env` files are usually written on one line with `\n` escapes.
                jwks_public_key: public_key.replace("\\n", "\n"),
                authorized_parties: split_list(&var("CLERK_AUTHORIZED_PARTIES").unwrap_or_default()),
                api_url: var("CLERK_API_URL")
                    .unwrap_or_else(|| "https://api.clerk.com/v1".into())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            (None, _) if auth_provider == "clerk" => {
                return Err(ConfigError::Missing("CLERK_SECRET_KEY"))
            }
            (_, None) if auth_provider == "clerk" => {
                return Err(ConfigError::Missing("CLERK_JWKS_PUBLIC_KEY"))
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            environment,
            cors_origins,
            request_timeout_secs,
            session: SessionPolicy {
                ttl: chrono::Duration::seconds(ttl_secs),
                max_active_sessions,
            },
            cookie: CookiePolicy::for_environment(environment),
            signin_rate_limit,
            private_rate_limit,
            auth_provider,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            clerk,
        })
    }
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, e.to_string())),
        None => Ok(default),
    }
}

fn rate_limit<F>(
    var: &F,
    window_key: &'static str,
    default_window_ms: u64,
    max_key: &'static str,
    default_max: u32,
) -> Result<RateLimitConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let window_ms: u64 = parse_or(var, window_key, default_window_ms)?;
    if window_ms == 0 {
        return Err(invalid(window_key, "must be positive"));
    }
    let max_requests: u32 = parse_or(var, max_key, default_max)?;
    if max_requests == 0 {
        return Err(invalid(max_key, "must be positive"));
    }
    Ok(RateLimitConfig {
        window: Duration::from_millis(window_ms),
        max_requests,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::auth::cookie::SameSite;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    const CLERK: &[(&str, &str)] = &[
        ("CLERK_SECRET_KEY", "sk_test_123"),
        ("CLERK_JWKS_PUBLIC_KEY", "-----BEGIN PUBLIC KEY-----\\nabc\\n-----END PUBLIC KEY-----"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(CLERK).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.session, SessionPolicy::default());
        assert_eq!(config.signin_rate_limit.window, Duration::from_secs(1));
        assert_eq!(config.signin_rate_limit.max_requests, 10);
        assert_eq!(config.private_rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.private_rate_limit.max_requests, 100);
        assert_eq!(config.auth_provider, "clerk");
        assert_eq!(config.cookie.same_site, SameSite::Lax);
        assert!(!config.cookie.secure);
    }

    #[test]
    fn clerk_key_escapes_are_expanded() {
        let config = load(CLERK).unwrap();
        let clerk = config.clerk.unwrap();

        assert!(clerk.jwks_public_key.contains("KEY-----\nabc\n-----END"));
        assert_eq!(clerk.api_url, "https://api.clerk.com/v1");
        assert!(clerk.authorized_parties.is_empty());
    }

    #[test]
    fn clerk_requires_keys() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("CLERK_SECRET_KEY")));
        assert_matches!(
            load(&[("CLERK_SECRET_KEY", "sk")]),
            Err(ConfigError::Missing("CLERK_JWKS_PUBLIC_KEY"))
        );
    }

    #[test]
    fn production_hardens_cookie() {
        let mut pairs = CLERK.to_vec();
        pairs.push(("APP_ENV", "production"));
        let config = load(&pairs).unwrap();

        assert!(config.cookie.secure);
        assert_eq!(config.cookie.same_site, SameSite::Strict);
    }

    #[test]
    fn session_cap_must_be_positive() {
        let mut pairs = CLERK.to_vec();
        pairs.push(("MAX_USER_ACTIVE_SESSIONS", "0"));
        assert_matches!(
            load(&pairs),
            Err(ConfigError::Invalid { key: "MAX_USER_ACTIVE_SESSIONS", .. })
        );
    }

    #[test]
    fn session_ttl_is_bounded() {
        for ttl in ["0", "10000000000000", "99999999999999999"] {
            let mut pairs = CLERK.to_vec();
            pairs.push(("SESSION_TTL_SECS", ttl));
            assert_matches!(
                load(&pairs),
                Err(ConfigError::Invalid { key: "SESSION_TTL_SECS", .. }),
                "{ttl}"
            );
        }

        let max = MAX_SESSION_TTL_SECS.to_string();
        let mut pairs = CLERK.to_vec();
        pairs.push(("SESSION_TTL_SECS", max.as_str()));
        assert!(load(&pairs).is_ok());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut pairs = CLERK.to_vec();
        pairs.push(("PORT", "eighty"));
        assert_matches!(load(&pairs), Err(ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = CLERK.to_vec();
        pairs.extend([
            ("SESSION_TTL_SECS", "3600"),
            ("MAX_USER_ACTIVE_SESSIONS", "2"),
            ("CLERK_AUTHORIZED_PARTIES", "https://app.example.com, https://admin.example.com"),
            ("CORS_ORIGINS", "https://app.example.com"),
        ]);
        let config = load(&pairs).unwrap();

        assert_eq!(config.session.ttl, chrono::Duration::hours(1));
        assert_eq!(config.session.max_active_sessions, 2);
        assert_eq!(config.cors_origins, vec!["https://app.example.com"]);
        assert_eq!(
            config.clerk.unwrap().authorized_parties,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
    }
}
