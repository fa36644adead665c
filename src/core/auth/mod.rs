//! Session token handling shared by the client and the request gate
//!
//! - Claims decoding for session tokens issued by the backend
//! - Request gate deciding pass-through vs. login redirect per navigation

pub mod gate;
pub mod jwt;

pub use gate::{GateDecision, evaluate, is_public_path, login_redirect};
#[cfg(feature = "ssr")]
pub use gate::{request_gate, session_token};
pub use jwt::{Claims, ClaimsError, decode_claims};
