//! Shared constants for storage keys, routes and token lifetimes

/// Relative base path for backend calls; a proxy layer rewrites it to the real host
pub const API_BASE_URL: &str = "/api";

/// Backend endpoints, relative to [`API_BASE_URL`]
pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";

/// Key under which the raw session token is stored (durable store and cookie)
pub const TOKEN_KEY: &str = "salesone_auth_token";

/// Durable store key for the serialized user profile
pub const USER_KEY: &str = "salesone_user";

/// Cookie lifetime in days
pub const COOKIE_EXPIRY_DAYS: i64 = 7;

/// Cookie path scope
pub const COOKIE_PATH: &str = "/";

/// Seconds before expiry at which a session counts as expiring soon (5 minutes)
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 5 * 60;

/// Login entry point of the front end
pub const LOGIN_PATH: &str = "/auth/login";

/// Registration page of the front end
pub const REGISTER_PATH: &str = "/auth/register";

/// Landing page after login when no callback is given
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// Query parameter carrying the originally requested path
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Routes exempt from the request gate
pub const PUBLIC_PATHS: [&str; 2] = [LOGIN_PATH, REGISTER_PATH];

/// Namespace forwarded to the backend by the proxy layer
pub const API_PATH_PREFIX: &str = "/api/";

/// Static asset prefixes never gated
pub const ASSET_PATH_PREFIXES: [&str; 2] = ["/pkg/", "/favicon.ico"];

/// Static asset suffixes never gated
pub const ASSET_PATH_SUFFIXES: [&str; 1] = [".svg"];
