//! Page-level auth flows
//!
//! What the login and register screens do around the session context,
//! without any rendering: resume the originally requested page after login,
//! send new accounts to the login page, and turn failures into one message
//! per screen.

use std::borrow::Cow;

use super::context::{AuthContext, AuthError};
use crate::client::navigation::NavigationKind;
use crate::core::constants::{DEFAULT_LANDING_PATH, LOGIN_PATH};

/// User-facing failure of an auth screen
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("The username or password is incorrect. Please try again.")]
    InvalidCredentials,

    #[error("That username already exists or is not valid. Please choose another one.")]
    RegistrationRejected,

    #[error("Something went wrong. Please try again.")]
    Unexpected,
}

impl FlowError {
    fn from_login(err: &AuthError) -> Self {
        match err {
            AuthError::Rejected { .. } | AuthError::MissingToken | AuthError::MalformedToken(_) => {
                FlowError::InvalidCredentials
            }
            AuthError::Network(_) | AuthError::Storage(_) => FlowError::Unexpected,
        }
    }

    fn from_register(err: &AuthError) -> Self {
        match err {
            AuthError::Rejected { .. } => FlowError::RegistrationRejected,
            _ => FlowError::Unexpected,
        }
    }
}

/// Where to go after login, given the raw `callbackUrl` query value.
///
/// Only local absolute paths are honored; anything else lands on the dashboard.
pub fn resume_target(callback: Option<&str>) -> String {
    let Some(raw) = callback.filter(|c| !c.is_empty()) else {
        return DEFAULT_LANDING_PATH.to_string();
    };

    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    if decoded.starts_with('/') && !decoded.starts_with("//") && !decoded.contains('\\') {
        decoded.into_owned()
    } else {
        tracing::warn!("Ignoring non-local callback: {}", raw);
        DEFAULT_LANDING_PATH.to_string()
    }
}

/// Submit the login form and resume the requested page on success
pub async fn submit_login(
    ctx: &AuthContext,
    username: &str,
    password: &str,
    callback: Option<&str>,
) -> Result<String, FlowError> {
    match ctx.sign_in(username, password).await {
        Ok(_) => {
            let target = resume_target(callback);
            tracing::info!("Login successful, redirecting to {}", target);
            ctx.navigator().replace(&target);
            Ok(target)
        }
        Err(e) => {
            tracing::warn!("Login error: {}", e);
            Err(FlowError::from_login(&e))
        }
    }
}

/// Submit the registration form and move on to the login page on success
pub async fn submit_register(
    ctx: &AuthContext,
    username: &str,
    password: &str,
) -> Result<(), FlowError> {
    match ctx.sign_up(username, password).await {
        Ok(()) => {
            ctx.navigator().push(LOGIN_PATH);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Registration error: {}", e);
            Err(FlowError::from_register(&e))
        }
    }
}

/// Send a user with a live session on to the dashboard.
///
/// The login screen replaces its history entry, the register screen pushes.
pub fn redirect_if_authenticated(ctx: &AuthContext, kind: NavigationKind) -> bool {
    if !ctx.is_authenticated() {
        return false;
    }
    tracing::debug!("Already authenticated, redirecting to dashboard ({})", kind);
    match kind {
        NavigationKind::Push => ctx.navigator().push(DEFAULT_LANDING_PATH),
        NavigationKind::Replace => ctx.navigator().replace(DEFAULT_LANDING_PATH),
    }
    true
}
