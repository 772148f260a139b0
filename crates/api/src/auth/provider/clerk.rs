//! Clerk identity provider.
//!
//! Session JWTs are verified locally against the instance's PEM public key.
//! Profiles and passwords go through the Clerk backend API.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use warden_core::identity::{IdentityProvider, ProviderError, ProviderUser};

use crate::config::{ClerkConfig, ConfigError};

pub const CLERK_PROVIDER: &str = "clerk";

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    /// Authorized party: the origin the token was minted for.
    azp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    password_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct VerifyPasswordResponse {
    verified: bool,
}

impl From<ClerkUser> for ProviderUser {
    fn from(user: ClerkUser) -> Self {
        let primary = user
            .primary_email_address_id
            .as_deref()
            .and_then(|id| user.email_addresses.iter().find(|e| e.id == id))
            .or_else(|| user.email_addresses.first());
        let email = primary.map(|e| e.email_address.clone()).unwrap_or_default();

        let full_name = [user.first_name.as_deref(), user.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let name = if !full_name.is_empty() {
            full_name
        } else if let Some(username) = user.username.filter(|u| !u.trim().is_empty()) {
            username
        } else {
            email.clone()
        };

        Self {
            id: user.id,
            email,
            name,
            password_enabled: user.password_enabled,
        }
    }
}

pub struct ClerkProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
    api_url: String,
    secret_key: String,
    http: reqwest::Client,
}

impl ClerkProvider {
    pub fn new(config: &ClerkConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let decoding_key =
            DecodingKey::from_rsa_pem(config.jwks_public_key.as_bytes()).map_err(|e| {
                ConfigError::Invalid {
                    key: "CLERK_JWKS_PUBLIC_KEY",
                    message: e.to_string(),
                }
            })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "PROVIDER_TIMEOUT_SECS",
                message: e.to_string(),
            })?;

        Ok(Self {
            decoding_key,
            validation,
            authorized_parties: config.authorized_parties.clone(),
            api_url: config.api_url.clone(),
            secret_key: config.secret_key.clone(),
            http,
        })
    }

    /// Tokens without `azp` are accepted. With an allow-list configured, a
    /// present `azp` must appear in it.
    fn is_authorized_party(&self, azp: Option<&str>) -> bool {
        match azp {
            None => true,
            Some(_) if self.authorized_parties.is_empty() => true,
            Some(party) => self.authorized_parties.iter().any(|p| p == party),
        }
    }

    fn decode_claims(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!(error = %err, "Rejected Clerk session token");
                None
            }
        }
    }

    fn user_url(&self, external_id: &str) -> String {
        format!("{}/users/{external_id}", self.api_url)
    }

    async fn fetch_user(&self, external_id: &str) -> Result<ClerkUser, ProviderError> {
        let response = self.send(self.http.get(self.user_url(external_id))).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        response
            .json::<ClerkUser>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Status { status, body }
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
    fn name(&self) -> &str {
        CLERK_PROVIDER
    }

    fn allow_password(&self) -> bool {
        true
    }

    async fn verify_token(&self, token: &str) -> Option<String> {
        let claims = self.decode_claims(token)?;
        if !self.is_authorized_party(claims.azp.as_deref()) {
            tracing::debug!(azp = ?claims.azp, "Clerk token minted for unauthorized party");
            return None;
        }
        Some(claims.sub)
    }

    async fn get_provider_user(&self, external_id: &str) -> Option<ProviderUser> {
        match self.fetch_user(external_id).await {
            Ok(user) => Some(user.into()),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to fetch Clerk user");
                None
            }
        }
    }

    async fn verify_password(
        &self,
        external_id: &str,
        password: &str,
    ) -> Result<bool, ProviderError> {
        let url = format!("{}/verify_password", self.user_url(external_id));
        let response = self
            .send(self.http.post(url).json(&json!({ "password": password })))
            .await?;

        match response.status() {
            // Clerk answers a wrong password with a client error, not `verified: false`.
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Ok(false),
            status if status.is_success() => response
                .json::<VerifyPasswordResponse>()
                .await
                .map(|body| body.verified)
                .map_err(|e| ProviderError::Decode(e.to_string())),
            _ => Err(status_error(response).await),
        }
    }

    async fn update_password(&self, external_id: &str, password: &str) -> Result<(), ProviderError> {
        let response = self
            .send(
                self.http
                    .patch(self.user_url(external_id))
                    .json(&json!({ "password": password })),
            )
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}
