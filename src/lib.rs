//! SalesOne Auth - session lifecycle and request gating for the SalesOne front end
//!
//! The client side keeps the session token in a durable store and a cookie,
//! attaches it to backend calls and tracks login state. The server side gates
//! page navigations on that cookie before anything protected is served.

pub mod client;
pub mod core;
