//! Persisted session state
//!
//! The signed-in profile and a cache-busting timestamp live behind
//! [`SessionStore`]: a JSON file for the running server, memory for tests.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{CoreError, CoreResult};
use crate::models::UserProfile;

/// Key holding the JSON profile blob
pub const PROFILE_KEY: &str = "userProfile";
/// Key holding the cache version timestamp (milliseconds since epoch)
pub const CACHE_VERSION_KEY: &str = "cacheVersion";

/// String key/value storage with synchronous access
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file, rewritten on every change
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl FileSessionStore {
    /// Open the store, reading existing values if the file is present
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                _ => {
                    log::warn!("Session file {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(storage_error(&path, e)),
        };
        log::debug!("Session store opened at {}", path.display());
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole file with blocking `std::fs` calls. It holds two short
    /// keys and changes only on login, logout and cache refresh, so handlers
    /// call this inline rather than through `spawn_blocking`.
    fn flush(&self, values: &Map<String, Value>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| storage_error(&self.path, e))?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(|e| storage_error(&self.path, e))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), Value::String(value.to_string()));
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

fn poisoned() -> CoreError {
    CoreError::Storage {
        message: "session lock poisoned".to_string(),
    }
}

fn storage_error(path: &Path, error: std::io::Error) -> CoreError {
    CoreError::Storage {
        message: format!("{}: {}", path.display(), error),
    }
}

/// Outcome of checking the cache version against its maximum age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRefresh {
    /// Stored version is recent enough
    Fresh,
    /// No version was stored; one has been written
    Initialized,
    /// Stored version was too old and has been replaced
    Expired,
}

/// Typed view over a [`SessionStore`]
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Stored profile; a malformed blob reads as signed out
    pub fn profile(&self) -> CoreResult<Option<UserProfile>> {
        let Some(raw) = self.store.get(PROFILE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                log::warn!("Ignoring malformed user profile: {}", e);
                Ok(None)
            }
        }
    }

    /// Profile with a user id, required before any call that needs one
    pub fn require_profile(&self) -> CoreResult<UserProfile> {
        match self.profile()? {
            Some(profile) if profile.has_user_id() => Ok(profile),
            _ => Err(CoreError::Unauthorized),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.require_profile().is_ok()
    }

    pub fn save_profile(&self, profile: &UserProfile) -> CoreResult<()> {
        let raw = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &raw)
    }

    pub fn clear_profile(&self) -> CoreResult<()> {
        self.store.remove(PROFILE_KEY)
    }

    pub fn cache_version(&self) -> CoreResult<Option<i64>> {
        Ok(self
            .store
            .get(CACHE_VERSION_KEY)?
            .and_then(|v| v.trim().parse::<i64>().ok()))
    }

    /// Store `now_ms` as the cache version when none exists or it is older than `max_age_ms`
    pub fn refresh_cache_version(&self, now_ms: i64, max_age_ms: i64) -> CoreResult<CacheRefresh> {
        match self.cache_version()? {
            Some(version) if now_ms - version <= max_age_ms => Ok(CacheRefresh::Fresh),
            Some(_) => {
                self.store.set(CACHE_VERSION_KEY, &now_ms.to_string())?;
                Ok(CacheRefresh::Expired)
            }
            None => {
                self.store.set(CACHE_VERSION_KEY, &now_ms.to_string())?;
                Ok(CacheRefresh::Initialized)
            }
        }
    }
}
