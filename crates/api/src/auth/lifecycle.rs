//! Session lifecycle: signin, validation, revocation, and provider-backed
//! password management.
//!
//! [`SessionManager`] raises typed [`LifecycleError`]s. Mapping them onto
//! HTTP responses is left to [`crate::error::AppError`].

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use warden_core::auth::{AuthError, UnauthenticatedReason};
use warden_core::identity::{IdentityProvider, ProviderError, ProviderUser};
use warden_core::session::{is_expired, SessionContext, SessionPolicy};
use warden_core::types::DbId;
use warden_db::models::session::{ActiveSession, CreateSession, Session};
use warden_db::models::user::UpsertUser;
use warden_db::models::user_provider::{CreateUserProvider, UserProvider};
use warden_db::repositories::{SessionRepo, UserProviderRepo, UserRepo};
use warden_db::DbPool;

use crate::middleware::client::ClientInfo;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ProviderError> for LifecycleError {
    fn from(err: ProviderError) -> Self {
        Self::Auth(AuthError::Provider(err))
    }
}

/// Result of a successful signin.
#[derive(Debug)]
pub struct SigninOutcome {
    pub user_id: DbId,
    /// The new session. Its `id` is the bearer token for the session cookie.
    pub session: Session,
    /// Sessions revoked to keep the user under the active session cap.
    pub evicted: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStatus {
    pub allow_password: bool,
    pub password_enabled: bool,
}

/// Where the user id for a signin comes from.
enum Identity {
    Linked(DbId),
    New(ProviderUser),
}

/// Orchestrates session issuance and validation against the database.
#[derive(Debug, Clone)]
pub struct SessionManager {
    pool: DbPool,
    policy: SessionPolicy,
    provider_timeout: Duration,
}

impl SessionManager {
    pub fn new(pool: DbPool, policy: SessionPolicy, provider_timeout: Duration) -> Self {
        Self {
            pool,
            policy,
            provider_timeout,
        }
    }

    /// Exchange a provider credential for a new session.
    ///
    /// Provider calls happen before the transaction opens. User upsert, link
    /// insert, session insert and cap eviction then commit together or not at
    /// all.
    pub async fn signin(
        &self,
        provider: &dyn IdentityProvider,
        credential: &str,
        client: &ClientInfo,
    ) -> Result<SigninOutcome, LifecycleError> {
        // 1. Verify the credential with the provider.
        let external_id = self
            .bounded(provider.verify_token(credential))
            .await
            .flatten()
            .ok_or(AuthError::InvalidCredential)?;

        // 2. Resolve the local user, fetching the remote profile for new identities.
        let identity =
            match UserProviderRepo::find_by_external_id(&self.pool, provider.name(), &external_id)
                .await?
            {
                Some(link) => Identity::Linked(link.user_id),
                None => Identity::New(self.fetch_profile(provider, &external_id).await?),
            };

        let mut tx = self.pool.begin().await?;

        let user_id = match identity {
            Identity::Linked(user_id) => user_id,
            Identity::New(profile) => {
                let user = UserRepo::upsert_by_email(
                    &mut *tx,
                    &UpsertUser {
                        email: profile.email,
                        name: profile.name,
                    },
                )
                .await?;
                // A concurrent signin may have linked this identity first; the
                // existing link's owner wins.
                let link = UserProviderRepo::link(
                    &mut *tx,
                    &CreateUserProvider {
                        user_id: user.id,
                        provider: provider.name().to_string(),
                        external_id: profile.id,
                        password_enabled: profile.password_enabled,
                    },
                )
                .await?;
                tracing::info!(
                    user_id = link.user_id,
                    provider = provider.name(),
                    "Linked new identity"
                );
                link.user_id
            }
        };

        // 3. Create the session and evict past the cap in the same transaction.
        let now = Utc::now();
        let (session, evicted) = SessionRepo::create_with_eviction(
            &mut *tx,
            &CreateSession {
                user_id,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                expires_at: self.policy.expires_at(now),
            },
            &self.policy,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id,
            provider = provider.name(),
            evicted = evicted.len(),
            "Session issued"
        );

        Ok(SigninOutcome {
            user_id,
            session,
            evicted,
        })
    }

    /// Revoke the caller's own session. Unknown or inactive ids are not an error.
    ///
    /// Returns whether a session was revoked.
    pub async fn signout(&self, session_id: &str) -> Result<bool, LifecycleError> {
        let revoked = SessionRepo::revoke(&self.pool, session_id).await?;
        tracing::debug!(revoked, "Signout");
        Ok(revoked)
    }

    /// Revoke another of the caller's sessions.
    pub async fn revoke_session(
        &self,
        ctx: &SessionContext,
        target_session_id: &str,
    ) -> Result<(), LifecycleError> {
        if target_session_id == ctx.session_id {
            return Err(AuthError::ForbiddenSelfRevoke.into());
        }
        if !SessionRepo::revoke_owned(&self.pool, ctx.user_id, target_session_id).await? {
            return Err(AuthError::SessionNotFound.into());
        }
        tracing::info!(user_id = ctx.user_id, "Session revoked by owner");
        Ok(())
    }

    /// Resolve a presented session token into the authenticated principal.
    ///
    /// Refreshes `last_active_at` on success. A failed refresh is logged and
    /// does not fail the request.
    pub async fn validate(&self, token: Option<&str>) -> Result<SessionContext, LifecycleError> {
        let token = token.ok_or(AuthError::Unauthenticated(UnauthenticatedReason::MissingToken))?;

        let session = SessionRepo::find_active(&self.pool, token)
            .await?
            .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::UnknownSession))?;

        if is_expired(session.expires_at, Utc::now()) {
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::Expired).into());
        }

        if let Err(err) = SessionRepo::touch(&self.pool, &session.id).await {
            tracing::warn!(
                user_id = session.user_id,
                error = %err,
                "Failed to refresh session activity"
            );
        }

        Ok(SessionContext {
            user_id: session.user_id,
            session_id: session.id,
        })
    }

    /// The caller's active sessions, newest first, with the current one marked.
    pub async fn list_sessions(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<ActiveSession>, LifecycleError> {
        Ok(SessionRepo::list_active(&self.pool, ctx.user_id, &ctx.session_id).await?)
    }

    pub async fn password_status(
        &self,
        ctx: &SessionContext,
        provider: &dyn IdentityProvider,
    ) -> Result<PasswordStatus, LifecycleError> {
        if !provider.allow_password() {
            return Ok(PasswordStatus {
                allow_password: false,
                password_enabled: false,
            });
        }
        let link = self.require_link(ctx, provider).await?;
        Ok(PasswordStatus {
            allow_password: true,
            password_enabled: link.password_enabled,
        })
    }

    /// Set a first password on a provider account that has none.
    pub async fn set_password(
        &self,
        ctx: &SessionContext,
        provider: &dyn IdentityProvider,
        new_password: &str,
    ) -> Result<(), LifecycleError> {
        if !provider.allow_password() {
            return Err(AuthError::NotAllowed.into());
        }
        let link = self.require_link(ctx, provider).await?;
        if link.password_enabled {
            return Err(AuthError::AlreadySet.into());
        }

        self.call_provider(provider.update_password(&link.external_id, new_password))
            .await?;
        UserProviderRepo::set_password_enabled(&self.pool, link.id, true).await?;

        tracing::info!(user_id = ctx.user_id, provider = provider.name(), "Password set");
        Ok(())
    }

    /// Replace the provider account's password.
    ///
    /// The current password is only checked when the account has one.
    pub async fn change_password(
        &self,
        ctx: &SessionContext,
        provider: &dyn IdentityProvider,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), LifecycleError> {
        if !provider.allow_password() {
            return Err(AuthError::NotAllowed.into());
        }
        let link = self.require_link(ctx, provider).await?;

        if link.password_enabled {
            let verified = self
                .call_provider(provider.verify_password(&link.external_id, current_password))
                .await?;
            if !verified {
                return Err(AuthError::InvalidCurrentPassword.into());
            }
        }

        self.call_provider(provider.update_password(&link.external_id, new_password))
            .await?;
        if !link.password_enabled {
            UserProviderRepo::set_password_enabled(&self.pool, link.id, true).await?;
        }

        tracing::info!(user_id = ctx.user_id, provider = provider.name(), "Password changed");
        Ok(())
    }

    async fn require_link(
        &self,
        ctx: &SessionContext,
        provider: &dyn IdentityProvider,
    ) -> Result<UserProvider, LifecycleError> {
        UserProviderRepo::find_for_user(&self.pool, ctx.user_id, provider.name())
            .await?
            .ok_or_else(|| {
                AuthError::Unauthenticated(UnauthenticatedReason::MissingProviderLink).into()
            })
    }

    async fn fetch_profile(
        &self,
        provider: &dyn IdentityProvider,
        external_id: &str,
    ) -> Result<ProviderUser, AuthError> {
        let profile = self
            .bounded(provider.get_provider_user(external_id))
            .await
            .flatten()
            .ok_or(AuthError::InvalidCredential)?;

        if profile.email.trim().is_empty() {
            tracing::warn!(provider = provider.name(), "Provider profile has no email");
            return Err(AuthError::InvalidCredential);
        }
        Ok(profile)
    }

    /// Run a verification call under the provider timeout. `None` on timeout.
    async fn bounded<F: Future>(&self, fut: F) -> Option<F::Output> {
        match tokio::time::timeout(self.provider_timeout, fut).await {
            Ok(output) => Some(output),
            Err(_) => {
                tracing::warn!(timeout = ?self.provider_timeout, "Identity provider call timed out");
                None
            }
        }
    }

    /// Run a provider call whose failure is an internal error.
    async fn call_provider<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        self.bounded(fut).await.unwrap_or(Err(ProviderError::Timeout))
    }
}
