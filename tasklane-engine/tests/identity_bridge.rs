use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tasklane_core::types::{
    AccessToken, Credentials, ExternalIdentity, Registration, UserId, UserRecord,
};
use tasklane_engine::identity::{AuthErrorKind, IdentityBridge, SyncError};
use tasklane_engine::traits::{AuthBackend, SessionStore, StoreError};
use tasklane_providers::RemoteError;

#[derive(Default)]
struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    // Makes `set_user` fail like a full disk.
    fail_set_user: AtomicBool,
}

impl SessionStore for MemoryStore {
    fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().unwrap().get("token").cloned())
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap()
            .insert("token".into(), token.into());
        Ok(())
    }

    fn user(&self) -> Result<Option<UserRecord>, StoreError> {
        let values = self.values.lock().unwrap();
        Ok(values
            .get("user")
            .and_then(|raw| serde_json::from_str(raw).ok()))
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        if self.fail_set_user.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        let raw = serde_json::to_string(user).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.values.lock().unwrap().insert("user".into(), raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

impl MemoryStore {
    fn put_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.into(), value.into());
    }
}

/// In-memory stand-in for the task backend's auth endpoints.
#[derive(Default)]
struct FakeBackend {
    accounts: Mutex<Vec<(UserRecord, String)>>,
    logins: Mutex<Vec<Credentials>>,
    registrations: Mutex<Vec<Registration>>,
    register_override: Mutex<Option<RemoteError>>,
}

impl FakeBackend {
    fn seed(&self, username: &str, email: &str, password: &str) -> UserId {
        let mut accounts = self.accounts.lock().unwrap();
        let id = UserId(accounts.len() as i64 + 1);
        accounts.push((record(id, username, email), password.into()));
        id
    }

    fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }
}

fn record(id: UserId, username: &str, email: &str) -> UserRecord {
    UserRecord {
        id,
        username: username.into(),
        email: email.into(),
        created_at: "2024-05-01T10:00:00".into(),
        updated_at: "2024-05-01T10:00:00".into(),
    }
}

#[async_trait::async_trait]
impl AuthBackend for FakeBackend {
    async fn register(&self, registration: &Registration) -> Result<UserRecord, RemoteError> {
        self.registrations.lock().unwrap().push(registration.clone());
        if let Some(e) = self.register_override.lock().unwrap().clone() {
            return Err(e);
        }
        let taken = self.accounts.lock().unwrap().iter().any(|(u, _)| {
            u.username == registration.identifier || u.email == registration.email
        });
        if taken {
            return Err(RemoteError::from_status(
                400,
                Some("Username or email already registered".into()),
            ));
        }
        let id = self.seed(
            &registration.identifier,
            &registration.email,
            &registration.secret,
        );
        Ok(record(id, &registration.identifier, &registration.email))
    }

    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, RemoteError> {
        self.logins.lock().unwrap().push(credentials.clone());
        let accounts = self.accounts.lock().unwrap();
        let found = accounts.iter().find(|(u, pw)| {
            (u.username == credentials.identifier || u.email == credentials.identifier)
                && *pw == credentials.secret
        });
        match found {
            Some((u, _)) => Ok(AccessToken {
                access_token: format!("token-{}", u.id),
                token_type: "bearer".into(),
            }),
            None => Err(RemoteError::from_status(
                401,
                Some("Incorrect username or password".into()),
            )),
        }
    }

    async fn current_user(&self, token: &str) -> Result<UserRecord, RemoteError> {
        let accounts = self.accounts.lock().unwrap();
        accounts
            .iter()
            .find(|(u, _)| token == format!("token-{}", u.id))
            .map(|(u, _)| u.clone())
            .ok_or_else(|| RemoteError::from_status(401, Some("Could not validate credentials".into())))
    }
}

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn bridge() -> (IdentityBridge, Arc<FakeBackend>, Arc<MemoryStore>) {
    let backend = Arc::new(FakeBackend::default());
    let store = Arc::new(MemoryStore::default());
    let bridge = IdentityBridge::new(backend.clone(), store.clone()).with_clock(fixed_now);
    (bridge, backend, store)
}

fn identity() -> ExternalIdentity {
    ExternalIdentity {
        id: "ext-42".into(),
        email: "grace@example.com".into(),
        name: "grace".into(),
    }
}

#[tokio::test]
async fn sign_up_then_sign_in_yields_same_user() {
    let (bridge, _backend, _store) = bridge();

    let up = bridge
        .sign_up("", "ada@example.com", "s3cret")
        .await
        .unwrap();
    assert_eq!(up.user.name, "ada");
    assert!(!up.user.email_verified);
    assert_eq!(up.session.expires_at, fixed_now() + Duration::days(7));

    bridge.sign_out();
    let inn = bridge.sign_in("ada@example.com", "s3cret").await.unwrap();
    assert_eq!(inn.user.id, up.user.id);
}

#[tokio::test]
async fn sign_up_persists_session() {
    let (bridge, _backend, store) = bridge();
    let s = bridge
        .sign_up("Ada", "ada@example.com", "s3cret")
        .await
        .unwrap();
    assert_eq!(store.token().unwrap().as_deref(), Some(s.session.token.as_str()));
    assert_eq!(store.user().unwrap().unwrap().username, "Ada");

    let current = bridge.current_session().unwrap();
    assert_eq!(current, s);
}

#[tokio::test]
async fn sign_up_conflict_is_reported_not_thrown() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "old");

    let err = bridge
        .sign_up("ada", "ada@example.com", "new")
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::Conflict);
    assert_eq!(err.status, Some(400));
    assert_eq!(err.message, "Username or email already registered");
    assert_eq!(backend.login_count(), 0);
    assert!(store.token().unwrap().is_none());
}

#[tokio::test]
async fn wrong_password_surfaces_remote_detail() {
    let (bridge, backend, _store) = bridge();
    backend.seed("ada", "ada@example.com", "right");

    let err = bridge
        .sign_in("ada@example.com", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::Remote);
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Incorrect username or password");
    assert!(bridge.current_session().is_none());
}

#[tokio::test]
async fn empty_credentials_never_reach_backend() {
    let (bridge, backend, _store) = bridge();
    let err = bridge.sign_in("  ", "pw").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::InvalidInput);
    let err = bridge.sign_up("ada", "ada@example.com", "").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::InvalidInput);
    assert_eq!(backend.login_count(), 0);
    assert!(backend.registrations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn partial_store_state_is_not_a_session() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "pw");
    bridge.sign_in("ada", "pw").await.unwrap();
    let user_raw = serde_json::to_string(&store.user().unwrap().unwrap()).unwrap();

    store.clear().unwrap();
    store.put_raw("token", "token-1");
    assert!(bridge.current_session().is_none());

    store.clear().unwrap();
    store.put_raw("user", &user_raw);
    assert!(bridge.current_session().is_none());

    store.put_raw("token", "token-1");
    assert!(bridge.is_authenticated());

    store.put_raw("user", "{not json");
    assert!(bridge.current_session().is_none());
}

#[tokio::test]
async fn sign_out_clears_everything() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "pw");
    bridge.sign_in("ada", "pw").await.unwrap();
    assert!(bridge.is_authenticated());

    let logins = backend.login_count();
    bridge.sign_out();
    assert!(bridge.current_session().is_none());
    assert!(store.token().unwrap().is_none());
    assert_eq!(backend.login_count(), logins);
}

#[tokio::test]
async fn current_session_expiry_follows_the_clock() {
    let backend = Arc::new(FakeBackend::default());
    backend.seed("ada", "ada@example.com", "pw");
    let store = Arc::new(MemoryStore::default());
    let now = Arc::new(Mutex::new(fixed_now()));
    let clock = now.clone();
    let bridge = IdentityBridge::new(backend, store)
        .with_clock(move || *clock.lock().unwrap());

    bridge.sign_in("ada", "pw").await.unwrap();
    let first = bridge.current_session().unwrap().session.expires_at;
    *now.lock().unwrap() += Duration::hours(1);
    let second = bridge.current_session().unwrap().session.expires_at;
    assert_eq!(second - first, Duration::hours(1));
}

#[tokio::test]
async fn sync_registration_creates_backend_user() {
    let (bridge, backend, store) = bridge();
    let user = bridge.sync_registration(&identity()).await.unwrap();
    assert_eq!(user.username, "grace");

    let regs = backend.registrations.lock().unwrap();
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0].secret, "betterauth_ext-42");
    assert_eq!(backend.login_count(), 0);
    assert!(store.token().unwrap().is_none());
}

#[tokio::test]
async fn sync_registration_conflict_falls_back_to_one_login() {
    let (bridge, backend, store) = bridge();
    backend.seed("grace", "grace@example.com", "betterauth_ext-42");

    let user = bridge.sync_registration(&identity()).await.unwrap();
    assert_eq!(user.email, "grace@example.com");

    let logins = backend.logins.lock().unwrap();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].identifier, "grace");
    assert_eq!(logins[0].secret, "betterauth_ext-42");
    assert!(store.token().unwrap().is_some());
    assert_eq!(store.user().unwrap(), Some(user));
}

#[tokio::test]
async fn sync_registration_fallback_failure_is_fatal() {
    let (bridge, backend, store) = bridge();
    // Password changed out-of-band: derived secret no longer matches.
    backend.seed("grace", "grace@example.com", "changed");

    let err = bridge.sync_registration(&identity()).await.unwrap_err();
    assert!(matches!(err, SyncError::FallbackLogin(RemoteError::Status { status: 401, .. })));
    assert_eq!(backend.login_count(), 1);
    assert!(store.token().unwrap().is_none());
}

#[tokio::test]
async fn sync_registration_other_errors_skip_login() {
    let (bridge, backend, _store) = bridge();
    *backend.register_override.lock().unwrap() =
        Some(RemoteError::from_status(503, Some("maintenance".into())));

    let err = bridge.sync_registration(&identity()).await.unwrap_err();
    match err {
        SyncError::Registration(e) => {
            assert_eq!(e, RemoteError::from_status(503, Some("maintenance".into())))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.login_count(), 0);
}

#[tokio::test]
async fn backend_token_persists_grant() {
    let (bridge, backend, store) = bridge();
    backend.seed("grace", "grace@example.com", "betterauth_ext-42");

    let grant = bridge.backend_token(&identity()).await.unwrap();
    assert_eq!(store.token().unwrap(), Some(grant.token.clone()));
    assert_eq!(bridge.current_session().unwrap().user.id, grant.user.id);
}

#[tokio::test]
async fn backend_token_without_account_fails() {
    let (bridge, _backend, _store) = bridge();
    let err = bridge.backend_token(&identity()).await.unwrap_err();
    assert!(matches!(err, SyncError::Login(_)));
}

#[tokio::test]
async fn sign_in_storage_failure_leaves_no_session() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "pw");
    store.fail_set_user.store(true, Ordering::SeqCst);

    let err = bridge.sign_in("ada", "pw").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::Storage);
    assert_eq!(err.status, None);
    assert!(err.message.contains("disk full"));
    assert!(store.token().unwrap().is_none());
    assert!(bridge.current_session().is_none());
}

#[tokio::test]
async fn failed_sync_persist_never_mixes_accounts() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "pw");
    backend.seed("grace", "grace@example.com", "betterauth_ext-42");
    bridge.sign_in("ada", "pw").await.unwrap();
    store.fail_set_user.store(true, Ordering::SeqCst);

    // Registration conflicts, fallback login succeeds, writing the user fails.
    let err = bridge.sync_registration(&identity()).await.unwrap_err();
    assert!(matches!(err, SyncError::Storage(_)));
    assert_eq!(backend.login_count(), 2);
    assert!(bridge.current_session().is_none());
    assert!(store.token().unwrap().is_none());
}

#[tokio::test]
async fn failed_backend_token_persist_clears_previous_session() {
    let (bridge, backend, store) = bridge();
    backend.seed("ada", "ada@example.com", "pw");
    backend.seed("grace", "grace@example.com", "betterauth_ext-42");
    bridge.sign_in("ada", "pw").await.unwrap();
    store.fail_set_user.store(true, Ordering::SeqCst);

    let err = bridge.backend_token(&identity()).await.unwrap_err();
    assert!(matches!(err, SyncError::Storage(_)));
    assert!(bridge.current_session().is_none());
}
