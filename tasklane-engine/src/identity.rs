use crate::traits::{AuthBackend, SessionStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tasklane_core::config::DEFAULT_SESSION_TTL_DAYS;
use tasklane_core::types::{
    AccessToken, AuthSession, BackendGrant, Credentials, ExternalIdentity, Registration,
    UserRecord, derive_identifier,
};
use tasklane_providers::RemoteError;
use thiserror::Error;

/// Prefix of the backend secret derived from an external identity id.
///
/// Changing it orphans every account created through `sync_registration`.
pub const DERIVED_SECRET_PREFIX: &str = "betterauth_";

const SIGN_UP_FAILED: &str = "Registration failed";
const SIGN_IN_FAILED: &str = "Login failed. Please check your email and password.";
const MISSING_CREDENTIALS: &str = "Email and password are required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    InvalidInput,
    Conflict,
    Remote,
    Transport,
    Storage,
}

/// Uniform failure shape returned by sign-up and sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl AuthError {
    fn invalid_input() -> Self {
        Self {
            kind: AuthErrorKind::InvalidInput,
            status: None,
            message: MISSING_CREDENTIALS.into(),
        }
    }

    fn from_remote(err: &RemoteError, fallback: &str) -> Self {
        let kind = match err {
            RemoteError::Conflict { .. } => AuthErrorKind::Conflict,
            RemoteError::Status { .. } => AuthErrorKind::Remote,
            RemoteError::Transport(_) | RemoteError::Decode(_) => AuthErrorKind::Transport,
        };
        let message = match (err.remote_message(), err) {
            (Some(m), _) => m.to_string(),
            (None, RemoteError::Transport(_) | RemoteError::Decode(_)) => err.to_string(),
            (None, _) => fallback.to_string(),
        };
        Self {
            kind,
            status: err.status(),
            message,
        }
    }

    fn from_store(err: &StoreError) -> Self {
        Self {
            kind: AuthErrorKind::Storage,
            status: None,
            message: format!("Could not save the session: {err}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backend registration failed: {0}")]
    Registration(RemoteError),

    /// Login with the derived secret failed after a registration conflict.
    /// The account exists but its secret no longer matches the identity id.
    #[error("backend login after registration conflict failed: {0}")]
    FallbackLogin(RemoteError),

    #[error("backend login failed: {0}")]
    Login(RemoteError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn derived_secret(identity: &ExternalIdentity) -> String {
    format!("{DERIVED_SECRET_PREFIX}{}", identity.id)
}

fn derived_credentials(identity: &ExternalIdentity) -> Credentials {
    Credentials::new(
        derive_identifier(&identity.name, &identity.email),
        derived_secret(identity),
    )
}

/// Reconciles sign-up/sign-in with the backend token and the local session store.
pub struct IdentityBridge {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    session_ttl: chrono::Duration,
    clock: Clock,
}

impl IdentityBridge {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend,
            store,
            session_ttl: chrono::Duration::days(i64::from(DEFAULT_SESSION_TTL_DAYS)),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_session_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let registration = Registration {
            identifier: derive_identifier(name, email),
            email: email.trim().to_string(),
            secret: password.to_string(),
        };
        let creds = registration.credentials();
        if registration.email.is_empty() || !creds.is_complete() {
            return Err(AuthError::invalid_input());
        }

        let backend_user = self
            .backend
            .register(&registration)
            .await
            .map_err(|e| {
                log::warn!("sign-up rejected for {}: {e}", registration.identifier);
                AuthError::from_remote(&e, SIGN_UP_FAILED)
            })?;
        log::info!("registered backend user {}", backend_user.id);

        self.sign_in_with(&creds, SIGN_UP_FAILED).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let creds = Credentials::new(email.trim(), password);
        if !creds.is_complete() {
            return Err(AuthError::invalid_input());
        }
        self.sign_in_with(&creds, SIGN_IN_FAILED).await
    }

    /// Always succeeds. A store that fails to clear is logged; there is nothing
    /// else the caller could do about it.
    pub fn sign_out(&self) {
        if let Err(e) = self.store.clear() {
            log::warn!("failed to clear session store: {e}");
        }
        log::info!("signed out");
    }

    /// Current session, or `None` unless both token and user are stored.
    ///
    /// `expires_at` is advisory and recomputed from the clock on every call.
    pub fn current_session(&self) -> Option<AuthSession> {
        let token = match self.store.token() {
            Ok(Some(t)) if !t.is_empty() => t,
            Ok(_) => return None,
            Err(e) => {
                log::warn!("failed to read token: {e}");
                return None;
            }
        };
        let user = match self.store.user() {
            Ok(Some(u)) => u,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("failed to read user: {e}");
                return None;
            }
        };
        Some(self.materialize(&user, token))
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_session().is_some()
    }

    /// Makes sure a backend account exists for an externally authenticated identity.
    ///
    /// Both systems are provisioned independently; the secret derived from the
    /// identity id lets a repeated registration degrade into a login.
    pub async fn sync_registration(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<UserRecord, SyncError> {
        let creds = derived_credentials(identity);
        let registration = Registration {
            identifier: creds.identifier.clone(),
            email: identity.email.clone(),
            secret: creds.secret.clone(),
        };

        match self.backend.register(&registration).await {
            Ok(user) => {
                log::info!("backend user {} created for external identity", user.id);
                Ok(user)
            }
            Err(e) if e.is_conflict() => {
                log::info!(
                    "backend user {} already exists, logging in instead",
                    creds.identifier
                );
                let (token, user) = self.establish(&creds).await.map_err(|e| {
                    log::error!("fallback login for {} failed: {e}", creds.identifier);
                    SyncError::FallbackLogin(e)
                })?;
                self.persist(&token.access_token, &user)?;
                Ok(user)
            }
            Err(e) => Err(SyncError::Registration(e)),
        }
    }

    /// Logs in with the derived secret and stores the resulting token and user.
    pub async fn backend_token(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<BackendGrant, SyncError> {
        let creds = derived_credentials(identity);
        let (token, user) = self.establish(&creds).await.map_err(SyncError::Login)?;
        self.persist(&token.access_token, &user)?;
        Ok(BackendGrant {
            token: token.access_token,
            user,
        })
    }

    async fn sign_in_with(
        &self,
        creds: &Credentials,
        fallback: &str,
    ) -> Result<AuthSession, AuthError> {
        let (token, user) = self.establish(creds).await.map_err(|e| {
            log::warn!("login failed for {}: {e}", creds.identifier);
            AuthError::from_remote(&e, fallback)
        })?;

        self.persist(&token.access_token, &user)
            .map_err(|e| AuthError::from_store(&e))?;

        log::info!("signed in as backend user {}", user.id);
        Ok(self.materialize(&user, token.access_token))
    }

    async fn establish(
        &self,
        creds: &Credentials,
    ) -> Result<(AccessToken, UserRecord), RemoteError> {
        let token = self.backend.login(creds).await?;
        let user = self.backend.current_user(&token.access_token).await?;
        Ok((token, user))
    }

    /// Writes token and user as one pair. On failure the store is cleared so a
    /// new token never sits next to a previous user.
    fn persist(&self, token: &str, user: &UserRecord) -> Result<(), StoreError> {
        let written = self
            .store
            .set_token(token)
            .and_then(|()| self.store.set_user(user));
        if let Err(e) = &written {
            log::error!("failed to persist session: {e}");
            if let Err(e) = self.store.clear() {
                log::warn!("failed to clear partial session: {e}");
            }
        }
        written
    }

    fn materialize(&self, user: &UserRecord, token: String) -> AuthSession {
        AuthSession::from_parts(user, token, (self.clock)() + self.session_ttl)
    }
}
