//! Shared configuration, constants and session token handling

pub mod auth;
pub mod config;
pub mod constants;

pub use config::{Config, ConfigError};
