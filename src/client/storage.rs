//! Backing stores for session data
//!
//! Two kinds of client-side storage hold the session:
//! - a durable key/value store that survives restarts and is never sent
//!   with requests (browser localStorage, or a JSON file for native clients)
//! - a cookie jar whose entries accompany navigations, which is what the
//!   request gate reads
//!
//! Only [`TokenStore`](super::token_store::TokenStore) should touch these.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value storage
pub trait DurableStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Attributes of a cookie being written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime in days
    pub expires_in_days: i64,
    /// Path scope
    pub path: String,
}

/// Cookie storage visible to the request gate
pub trait CookieStore: Send + Sync {
    /// Value of a live (unexpired) cookie
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StorageError>;
    /// Remove a cookie written with the same path scope
    fn remove(&self, name: &str, path: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory durable store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl DurableStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// A cookie held by [`MemoryCookies`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory cookie jar
#[derive(Debug, Default)]
pub struct MemoryCookies {
    cookies: DashMap<String, StoredCookie>,
}

impl MemoryCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw cookie entry, including attributes
    pub fn entry(&self, name: &str) -> Option<StoredCookie> {
        self.cookies.get(name).map(|c| c.value().clone())
    }

    /// Render the live cookies as a `Cookie` request header value
    #[cfg(test)]
    pub(crate) fn header_value(&self) -> Option<String> {
        let now = Utc::now();
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| !c.value().is_expired(now))
            .map(|c| format!("{}={}", c.key(), c.value().value))
            .collect();

        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(pairs.join("; "))
    }
}

impl CookieStore for MemoryCookies {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let now = Utc::now();
        // Drop expired entries on read
        self.cookies.remove_if(name, |_, cookie| cookie.is_expired(now));
        Ok(self.cookies.get(name).map(|c| c.value().value.clone()))
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StorageError> {
        self.cookies.insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                path: options.path.clone(),
                expires_at: Utc::now() + Duration::days(options.expires_in_days),
            },
        );
        Ok(())
    }

    fn remove(&self, name: &str, path: &str) -> Result<(), StorageError> {
        self.cookies.remove_if(name, |_, cookie| cookie.path == path);
        Ok(())
    }
}

// ============================================================================
// File-backed durable store
// ============================================================================

/// Durable store persisted as a JSON object in a single file.
///
/// Every write rewrites the whole file, which is fine for a handful of keys.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened file storage at {}", path.display());

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        let mut next = items.clone();
        f(&mut next);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&next)?)?;

        // Only a written change becomes visible to readers
        *items = next;
        Ok(())
    }
}

impl DurableStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}
