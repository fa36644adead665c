//! Token store replicating the session across both backing stores
//!
//! The request gate only sees the cookie, while the session context reads the
//! durable store first on startup. Every write therefore goes through this
//! module and updates both under one lock.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::storage::{CookieOptions, CookieStore, DurableStore, StorageError};
use crate::core::constants::{COOKIE_EXPIRY_DAYS, COOKIE_PATH, TOKEN_KEY, USER_KEY};

/// User profile derived from the session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Persisted session: raw token plus the profile decoded from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

/// Session persistence over a durable store and a cookie jar
#[derive(Clone)]
pub struct TokenStore {
    durable: Arc<dyn DurableStore>,
    cookies: Arc<dyn CookieStore>,
    write_lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn DurableStore>, cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            durable,
            cookies,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cookie_options() -> CookieOptions {
        CookieOptions {
            expires_in_days: COOKIE_EXPIRY_DAYS,
            path: COOKIE_PATH.to_string(),
        }
    }

    /// Persist a session to both stores.
    ///
    /// On failure the partial write is rolled back so the stores never disagree.
    pub fn save(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let _guard = self.lock();

        let result = self.write_both(token, user);
        if let Err(ref e) = result {
            tracing::error!("Failed to persist session, rolling back: {}", e);
            if let Err(e) = self.clear_both() {
                tracing::error!("Rollback after failed save also failed: {}", e);
            }
        }
        result
    }

    fn write_both(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let profile = serde_json::to_string(user).map_err(StorageError::Corrupted)?;
        self.durable.set_item(TOKEN_KEY, token)?;
        self.durable.set_item(USER_KEY, &profile)?;
        self.cookies.set(TOKEN_KEY, token, &Self::cookie_options())?;
        Ok(())
    }

    /// Load the persisted session.
    ///
    /// The token comes from the durable store, falling back to the cookie.
    /// A profile that no longer parses clears both stores and reads as absent.
    pub fn load(&self) -> Result<Option<StoredSession>, StorageError> {
        let _guard = self.lock();

        let Some(token) = self.read_token()? else {
            return Ok(None);
        };
        let Some(profile) = self.durable.get_item(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&profile) {
            Ok(user) => Ok(Some(StoredSession { token, user })),
            Err(e) => {
                tracing::error!("Failed to parse stored user, clearing session: {}", e);
                self.clear_both()?;
                Ok(None)
            }
        }
    }

    /// Current token, durable store first then cookie
    pub fn token(&self) -> Result<Option<String>, StorageError> {
        let _guard = self.lock();
        self.read_token()
    }

    fn read_token(&self) -> Result<Option<String>, StorageError> {
        match self.durable.get_item(TOKEN_KEY)? {
            Some(token) if !token.is_empty() => Ok(Some(token)),
            _ => Ok(self.cookies.get(TOKEN_KEY)?.filter(|t| !t.is_empty())),
        }
    }

    /// Remove the session from both stores
    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock();
        self.clear_both()
    }

    fn clear_both(&self) -> Result<(), StorageError> {
        // Attempt every removal even if one fails, then report the first error
        let results = [
            self.durable.remove_item(TOKEN_KEY),
            self.durable.remove_item(USER_KEY),
            self.cookies.remove(TOKEN_KEY, COOKIE_PATH),
        ];
        results.into_iter().collect()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
