//! External identity provider contract.
//!
//! A provider verifies bearer credentials issued by a third party and exposes
//! the remote user profile. Providers are registered in a [`ProviderRegistry`]
//! keyed by [`IdentityProvider::name`], which is also the value stored in the
//! `user_providers.provider` column.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote profile returned by [`IdentityProvider::get_provider_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// The provider's stable user id (the `external_id` of the link).
    pub id: String,
    pub email: String,
    pub name: String,
    /// Whether the provider account already has a password.
    pub password_enabled: bool,
}

/// Transport or protocol failure while talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response could not be decoded: {0}")]
    Decode(String),

    #[error("provider call timed out")]
    Timeout,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registry key and `user_providers.provider` value.
    fn name(&self) -> &str;

    /// Whether users of this provider may manage a password through us.
    fn allow_password(&self) -> bool;

    /// Verify a bearer credential, returning the provider's user id.
    ///
    /// Any failure (bad signature, expiry, unreachable key material) yields
    /// `None`.
    async fn verify_token(&self, token: &str) -> Option<String>;

    /// Fetch the remote profile. `None` when the profile is unavailable.
    async fn get_provider_user(&self, external_id: &str) -> Option<ProviderUser>;

    async fn verify_password(&self, external_id: &str, password: &str)
        -> Result<bool, ProviderError>;

    async fn update_password(&self, external_id: &str, password: &str)
        -> Result<(), ProviderError>;
}

/// Providers known to this process, with one designated default.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
    default: Arc<dyn IdentityProvider>,
}

impl ProviderRegistry {
    /// Create a registry whose default provider is `default`.
    pub fn new(default: Arc<dyn IdentityProvider>) -> Self {
        let mut providers = HashMap::new();
        providers.insert(default.name().to_string(), Arc::clone(&default));
        Self { providers, default }
    }

    /// Register an additional provider. A provider with the same name is replaced.
    pub fn with(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn default_provider(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.default)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default", &self.default.name())
            .finish()
    }
}
