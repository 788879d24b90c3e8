//! Durable key-value storage for the login session
//!
//! The session is kept under two keys: the token string and the user record
//! serialized as JSON.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{Session, User};
use crate::{CoreError, CoreResult};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user";

/// String key-value store with typed session helpers
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove(&self, key: &str) -> CoreResult<()>;

    /// The stored session, if both the token and the user are present.
    fn load(&self) -> CoreResult<Option<Session>> {
        let (Some(token), Some(user)) = (self.get(TOKEN_KEY)?, self.get(USER_KEY)?) else {
            return Ok(None);
        };
        let user: User = serde_json::from_str(&user)?;
        Ok(Some(Session { token, user }))
    }

    fn save(&self, session: &Session) -> CoreResult<()> {
        self.set(TOKEN_KEY, &session.token)?;
        self.set(USER_KEY, &serde_json::to_string(&session.user)?)
    }

    fn clear(&self) -> CoreResult<()> {
        self.remove(TOKEN_KEY)?;
        self.remove(USER_KEY)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Session store backed by a JSON object file
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CoreResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_all`, but an unparsable file counts as empty so writes
    /// replace it. The flag reports whether the file was discarded.
    fn read_for_write(&self) -> CoreResult<(BTreeMap<String, String>, bool)> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(CoreError::Serialization(e)) => {
                warn!("Discarding unreadable session file {}: {}", self.path.display(), e);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> CoreResult<()> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Wrote session file {}", self.path.display());
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let _guard = self.lock.lock();
        let (mut entries, _) = self.read_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let _guard = self.lock.lock();
        let (mut entries, discarded) = self.read_for_write()?;
        if entries.remove(key).is_some() || discarded {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            token: "token-1-abc".to_string(),
            user: User {
                id: "user-1".to_string(),
                name: "alice".to_string(),
                email: "alice@co.com".to_string(),
            },
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_user_is_stored_as_json() {
        let store = MemorySessionStore::new();
        store.save(&session()).unwrap();
        let raw = store.get(USER_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["email"], "alice@co.com");
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("token-1-abc"));
    }

    #[test]
    fn test_token_without_user_is_no_session() {
        let store = MemorySessionStore::new();
        store.set(TOKEN_KEY, "orphan").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileSessionStore::new(&path).save(&session()).unwrap();
        assert!(path.exists());
        assert_eq!(FileSessionStore::new(&path).load().unwrap(), Some(session()));

        FileSessionStore::new(&path).clear().unwrap();
        assert!(!path.exists());
        assert_eq!(FileSessionStore::new(&path).load().unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileSessionStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn test_file_store_clear_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"auth_token\": ").unwrap();

        let store = FileSessionStore::new(&path);
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));
    }
}
