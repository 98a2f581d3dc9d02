use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tasklane_core::types::UserRecord;
use tasklane_engine::traits::{SessionStore, StoreError};

use crate::config_store::write_atomic;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

type Entries = BTreeMap<String, String>;

fn decode_user(raw: Option<&String>) -> Option<UserRecord> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            log::warn!("stored user is unreadable, treating as signed out: {e}");
            None
        }
    }
}

fn encode_user(user: &UserRecord) -> Result<String, StoreError> {
    serde_json::to_string(user).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Session store backed by one small JSON file of string keys.
///
/// Every read goes to disk, so separate processes sharing the file see each
/// other's writes on their next read.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write within this process.
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::warn!(
                    "session file {} is corrupt, ignoring it: {e}",
                    self.path.display()
                );
                Ok(Entries::new())
            }
        }
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read_entries()?;
        f(&mut entries);
        let json =
            serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Encode(e.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_entries()?.remove(TOKEN_KEY))
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.update(|e| {
            e.insert(TOKEN_KEY.into(), token.into());
        })
    }

    fn user(&self) -> Result<Option<UserRecord>, StoreError> {
        Ok(decode_user(self.read_entries()?.get(USER_KEY)))
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let raw = encode_user(user)?;
        self.update(|e| {
            e.insert(USER_KEY.into(), raw);
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<Entries>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(TOKEN_KEY).cloned())
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.entries().insert(TOKEN_KEY.into(), token.into());
        Ok(())
    }

    fn user(&self) -> Result<Option<UserRecord>, StoreError> {
        Ok(decode_user(self.entries().get(USER_KEY)))
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let raw = encode_user(user)?;
        self.entries().insert(USER_KEY.into(), raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries().clear();
        Ok(())
    }
}
