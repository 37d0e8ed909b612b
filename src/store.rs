//! Credential storage
//!
//! Key/value storage for the token pair and the signed-in user record.
//! Only the token manager writes to it.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A persisted credential field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    /// JSON-encoded identity record
    User,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::User => "user",
        }
    }
}

pub trait TokenStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: CredentialKey) -> Result<(), StoreError>;

    /// Remove every credential field
    fn clear(&self) -> Result<(), StoreError> {
        for key in CredentialKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<&'static str, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.entries).get(key.as_str()).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.as_str(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        lock(&self.entries).remove(key.as_str());
        Ok(())
    }
}

/// Credentials kept in a JSON object on disk.
///
/// Every write rewrites the whole file; the mutex serializes
/// read-modify-write cycles within the process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let _guard = lock(&self.guard);
        let mut entries = self.read()?;
        f(&mut entries);
        self.write(&entries)
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let _guard = lock(&self.guard);
        Ok(self.read()?.remove(key.as_str()))
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.update(BTreeMap::clear)
    }
}
