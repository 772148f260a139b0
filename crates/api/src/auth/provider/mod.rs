//! Identity provider adapters and registry construction.

pub mod clerk;

use std::sync::Arc;

use warden_core::identity::ProviderRegistry;

use crate::config::{ConfigError, ServerConfig};

use self::clerk::{ClerkProvider, CLERK_PROVIDER};

/// Build the provider registry from configuration.
///
/// `AUTH_PROVIDER` selects the default. Every provider that is fully
/// configured is registered.
pub fn build_providers(config: &ServerConfig) -> Result<ProviderRegistry, ConfigError> {
    match config.auth_provider.as_str() {
        CLERK_PROVIDER => {
            let clerk = config
                .clerk
                .as_ref()
                .ok_or(ConfigError::Missing("CLERK_SECRET_KEY"))?;
            let provider = ClerkProvider::new(clerk, config.provider_timeout)?;
            Ok(ProviderRegistry::new(Arc::new(provider)))
        }
        other => Err(ConfigError::Invalid {
            key: "AUTH_PROVIDER",
            message: format!("unsupported identity provider '{other}'"),
        }),
    }
}
