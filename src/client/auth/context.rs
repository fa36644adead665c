//! Auth context for managing session state
//!
//! This module provides the session context that:
//! - Holds the current user and session token in memory
//! - Handles login, logout and registration against the backend
//! - Restores the session from the token store on startup
//! - Keeps the token store and in-memory state in step on every change

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::Value;

use crate::client::api::{ApiClient, ApiOptions, ApiResponse};
use crate::client::navigation::Navigator;
use crate::client::storage::{CookieStore, DurableStore, StorageError};
use crate::client::token_store::{TokenStore, User};
use crate::core::auth::jwt::{ClaimsError, decode_claims};
use crate::core::config::{Config, ConfigError};
use crate::core::constants::{LOGIN_ENDPOINT, LOGIN_PATH, REGISTER_ENDPOINT};

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum SessionPhase {
    /// Storage has not been read yet
    #[default]
    #[display("uninitialized")]
    Uninitialized,
    /// Restoring from storage or waiting on the backend
    #[display("loading")]
    Loading,
    /// Token and profile present
    #[display("authenticated")]
    Authenticated,
    /// No session
    #[display("anonymous")]
    Anonymous,
}

/// In-memory session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
    initialized: bool,
}

impl SessionState {
    /// True iff both token and profile are present
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if !self.initialized {
            SessionPhase::Uninitialized
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// Login / registration failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Login response did not contain a session token")]
    MissingToken,

    #[error("Session token could not be decoded: {0}")]
    MalformedToken(#[from] ClaimsError),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Convert a failed API response into an error, passing successes through
    fn check<T>(response: ApiResponse<T>) -> Result<Option<T>, AuthError> {
        if response.is_network_error() {
            return Err(AuthError::Network(response.error.unwrap_or_default()));
        }
        if let Some(message) = response.error {
            return Err(AuthError::Rejected {
                status: response.status,
                message,
            });
        }
        Ok(response.data)
    }
}

/// Credentials sent to the login and register endpoints
#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Login response from the backend
#[derive(Debug, serde::Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Session context shared by everything that needs the current session
#[derive(Clone)]
pub struct AuthContext {
    state: Arc<RwLock<SessionState>>,
    api: ApiClient,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthContext {
    /// Create a context; `api` should share `tokens` so requests carry the session
    pub fn new(api: ApiClient, tokens: TokenStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            api,
            tokens,
            navigator,
        }
    }

    /// Wire a context over the given backing stores using `config` for the API base.
    ///
    /// Outside a browser there is no page origin to resolve against, so the
    /// API base must be an absolute URL.
    pub fn from_config(
        config: &Config,
        durable: Arc<dyn DurableStore>,
        cookies: Arc<dyn CookieStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        if !config.has_absolute_api_base() {
            return Err(ConfigError::RelativeApiBase(config.api_base_url.clone()));
        }
        let tokens = TokenStore::new(durable, cookies);
        let api = ApiClient::new(config.api_base_url.clone(), tokens.clone());
        Ok(Self::new(api, tokens, navigator))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_loading(&self, loading: bool) {
        self.write_state().loading = loading;
    }

    /// Restore the session from storage.
    ///
    /// A restored session is saved again so a missing cookie copy is rewritten.
    pub fn initialize(&self) -> SessionPhase {
        self.set_loading(true);

        let restored = match self.tokens.load() {
            Ok(Some(stored)) => match self.tokens.save(&stored.token, &stored.user) {
                Ok(()) => Some(stored),
                Err(e) => {
                    tracing::error!("Failed to re-persist restored session: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to load stored session: {}", e);
                None
            }
        };

        let mut state = self.write_state();
        match restored {
            Some(stored) => {
                tracing::debug!("Restored session for {}", stored.user.username);
                state.token = Some(stored.token);
                state.user = Some(stored.user);
            }
            None => {
                state.token = None;
                state.user = None;
            }
        }
        state.loading = false;
        state.initialized = true;
        state.phase()
    }

    /// Log in and adopt the returned session
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.set_loading(true);
        let response: ApiResponse<LoginResponse> = self
            .api
            .post(
                LOGIN_ENDPOINT,
                &Credentials { username, password },
                ApiOptions::default().without_auth(),
            )
            .await;
        self.set_loading(false);

        let token = AuthError::check(response)?
            .ok_or(AuthError::MissingToken)?
            .access_token;

        // A token that cannot be decoded is never adopted
        let claims = decode_claims(&token)?;
        let user = User {
            id: claims.id,
            username: claims.username,
        };

        {
            let mut state = self.write_state();
            // A failed save has already emptied both stores
            if let Err(e) = self.tokens.save(&token, &user) {
                state.token = None;
                state.user = None;
                return Err(e.into());
            }
            state.token = Some(token);
            state.user = Some(user.clone());
        }

        tracing::info!("Login successful: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Log in, reporting only whether it worked
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.sign_in(username, password).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", username, e);
                false
            }
        }
    }

    /// Register a new account. Does not log in.
    pub async fn sign_up(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.set_loading(true);
        let response: ApiResponse<Value> = self
            .api
            .post(
                REGISTER_ENDPOINT,
                &Credentials { username, password },
                ApiOptions::default().without_auth(),
            )
            .await;
        self.set_loading(false);

        let data = AuthError::check(response)?;
        tracing::info!("Registration successful: {:?}", data);
        Ok(())
    }

    /// Register, reporting only whether it worked
    pub async fn register(&self, username: &str, password: &str) -> bool {
        match self.sign_up(username, password).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Registration failed for {}: {}", username, e);
                false
            }
        }
    }

    /// Drop the session everywhere and go to the login page
    pub fn logout(&self) {
        {
            let mut state = self.write_state();
            state.token = None;
            state.user = None;
            if let Err(e) = self.tokens.clear() {
                tracing::error!("Failed to clear stored session: {}", e);
            }
        }
        self.navigator.push(LOGIN_PATH);
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.read_state().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().token.clone()
    }

    pub fn loading(&self) -> bool {
        self.read_state().loading
    }

    pub fn phase(&self) -> SessionPhase {
        self.read_state().phase()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    /// Check if the session token expires within the refresh threshold
    pub fn expires_soon(&self, now: i64) -> bool {
        self.token()
            .and_then(|token| decode_claims(&token).ok())
            .is_some_and(|claims| claims.is_expiring_soon(now))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}
