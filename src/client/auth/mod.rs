//! Session lifecycle for the front end
//!
//! This module provides the session context and the page-level flows built
//! on it (login with callback resumption, registration, already-logged-in
//! redirects).

mod context;
mod flows;

pub use context::{AuthContext, AuthError, SessionPhase, SessionState};
pub use flows::{
    FlowError, redirect_if_authenticated, resume_target, submit_login, submit_register,
};
