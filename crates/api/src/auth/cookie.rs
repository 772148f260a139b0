//! Session cookie construction and parsing.

use axum::http::header::{InvalidHeaderValue, AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use warden_core::types::Timestamp;

use crate::config::Environment;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "warden_sid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
        }
    }
}

/// Attributes applied to every session cookie this server sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Production cookies are `Secure` and `SameSite=Strict`. Elsewhere the
    /// policy is relaxed so the API can be exercised over plain HTTP.
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            Self {
                secure: true,
                same_site: SameSite::Strict,
            }
        } else {
            Self {
                secure: false,
                same_site: SameSite::Lax,
            }
        }
    }

    fn attributes(&self) -> String {
        let mut attrs = format!("Path=/; HttpOnly; SameSite={}", self.same_site.as_str());
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }
}

/// Build the `Set-Cookie` value for a new session. Expiry mirrors the session's `expires_at`.
pub fn session_cookie(
    policy: &CookiePolicy,
    token: &str,
    expires_at: Timestamp,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; {}; Expires={expires}",
        policy.attributes()
    ))
}

/// Build a `Set-Cookie` value that makes the client drop its session cookie.
pub fn clear_session_cookie(policy: &CookiePolicy) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}=; {}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        policy.attributes()
    ))
}

/// Read the session token from the request's `Cookie` headers.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .map(|(_, val)| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

/// Read a `Bearer` credential from the `Authorization` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
