//! Request gate for page navigations
//!
//! Runs before any protected page is served and redirects navigations
//! without a live session to the login entry point. The gate only decodes
//! the token and checks its expiry claim. It makes no network call and does
//! not verify signatures, so it is a UX guard: the backend still validates
//! the token on every protected API call.

use crate::core::auth::jwt::decode_claims;
use crate::core::constants::{
    API_PATH_PREFIX, ASSET_PATH_PREFIXES, ASSET_PATH_SUFFIXES, CALLBACK_PARAM, LOGIN_PATH,
    PUBLIC_PATHS,
};

/// Outcome of gating one navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Serve the request unchanged
    Allow,
    /// Redirect to the given location
    Redirect(String),
}

/// Check if a path is exempt from authentication (exact or prefix match)
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Check if a path is a static asset or belongs to the proxied API namespace
fn is_ungated(path: &str) -> bool {
    path.starts_with(API_PATH_PREFIX)
        || ASSET_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || ASSET_PATH_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Login location that returns the user to `path` afterwards
pub fn login_redirect(path: &str) -> String {
    format!(
        "{LOGIN_PATH}?{CALLBACK_PARAM}={}",
        urlencoding::encode(path)
    )
}

/// Decide whether a navigation to `path` may proceed.
///
/// `token` is the session token found on the request, `now` the current
/// Unix time in seconds.
pub fn evaluate(path: &str, token: Option<&str>, now: i64) -> GateDecision {
    if is_ungated(path) || is_public_path(path) {
        return GateDecision::Allow;
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        tracing::info!(path, "No token found, redirecting to login");
        return GateDecision::Redirect(login_redirect(path));
    };

    match decode_claims(token) {
        Ok(claims) if claims.is_expired(now) => {
            tracing::info!(path, exp = claims.exp, "Token expired, redirecting to login");
            GateDecision::Redirect(login_redirect(path))
        }
        Ok(claims) => {
            tracing::debug!(path, user_id = claims.id, "Session valid");
            GateDecision::Allow
        }
        Err(e) => {
            // An undecodable token is untrustworthy, so no callback is attached
            tracing::warn!(path, "Invalid token: {}", e);
            GateDecision::Redirect(LOGIN_PATH.to_string())
        }
    }
}

#[cfg(feature = "ssr")]
mod middleware {
    use axum::{
        extract::Request,
        http::{HeaderMap, header},
        middleware::Next,
        response::{IntoResponse, Redirect, Response},
    };
    use axum_extra::extract::cookie::CookieJar;
    use chrono::Utc;

    use super::{GateDecision, evaluate};
    use crate::core::constants::TOKEN_KEY;

    /// Session token from the cookie, falling back to a Bearer Authorization header
    pub fn session_token(headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        if let Some(cookie) = jar.get(TOKEN_KEY)
            && !cookie.value().is_empty()
        {
            return Some(cookie.value().to_string());
        }

        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    /// Axum middleware applying [`evaluate`] to every request.
    ///
    /// Install with `axum::middleware::from_fn(request_gate)`.
    pub async fn request_gate(request: Request, next: Next) -> Response {
        let token = session_token(request.headers());
        let now = Utc::now().timestamp();

        match evaluate(request.uri().path(), token.as_deref(), now) {
            GateDecision::Allow => next.run(request).await,
            GateDecision::Redirect(location) => Redirect::temporary(&location).into_response(),
        }
    }
}

#[cfg(feature = "ssr")]
pub use middleware::{request_gate, session_token};
