//! Client-side session handling
//!
//! - Backing stores (durable key/value store and cookie jar)
//! - Token store replicating the session across both
//! - API client attaching the session token to backend calls
//! - Session context and auth flows

pub mod api;
pub mod auth;
pub mod navigation;
pub mod storage;
pub mod token_store;

pub use api::{ApiClient, ApiOptions, ApiResponse, Payload};
pub use auth::{AuthContext, AuthError, SessionPhase};
pub use navigation::{NavigationKind, NavigationLog, Navigator};
pub use storage::{
    CookieOptions, CookieStore, DurableStore, FileStorage, MemoryCookies, MemoryStorage,
    StorageError,
};
pub use token_store::{StoredSession, TokenStore, User};
