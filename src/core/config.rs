//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.

use super::constants::API_BASE_URL;

/// Default address the gate server listens on
const DEFAULT_SITE_ADDR: &str = "127.0.0.1:3000";

/// Default directory holding the built front end
const DEFAULT_SITE_ROOT: &str = "target/site";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL prepended to relative API endpoints
    /// Example: http://127.0.0.1:3000/api
    pub api_base_url: String,

    /// Address the gate server binds to
    pub site_addr: String,

    /// Directory served behind the request gate
    pub site_root: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid SITE_ADDR: {0}")]
    InvalidSiteAddr(String),

    #[error("API_BASE_URL must be an absolute http(s) URL outside a browser, got: {0}")]
    RelativeApiBase(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or_else(|_| API_BASE_URL.to_string()),
            site_addr: std::env::var("SITE_ADDR").unwrap_or_else(|_| DEFAULT_SITE_ADDR.to_string()),
            site_root: std::env::var("SITE_ROOT").unwrap_or_else(|_| DEFAULT_SITE_ROOT.to_string()),
        }
    }

    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        self.site_addr
            .parse()
            .map_err(|_| ConfigError::InvalidSiteAddr(self.site_addr.clone()))
    }

    /// Check if the API base is an absolute URL (required outside a browser)
    pub fn has_absolute_api_base(&self) -> bool {
        self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            site_addr: DEFAULT_SITE_ADDR.to_string(),
            site_root: DEFAULT_SITE_ROOT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api_base_url, "/api");
        assert_eq!(config.site_addr, "127.0.0.1:3000");
        assert_eq!(config.site_root, "target/site");
        assert!(!config.has_absolute_api_base());
    }

    #[test]
    fn test_socket_addr_valid() {
        let config = Config {
            site_addr: "0.0.0.0:8080".to_string(),
            ..Config::default()
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_socket_addr_invalid() {
        let config = Config {
            site_addr: "not-an-address".to_string(),
            ..Config::default()
        };

        let result = config.socket_addr();
        assert!(matches!(result, Err(ConfigError::InvalidSiteAddr(addr)) if addr == "not-an-address"));
    }

    #[test]
    fn test_absolute_api_base() {
        let config = Config {
            api_base_url: "https://api.salesone.co.kr".to_string(),
            ..Config::default()
        };

        assert!(config.has_absolute_api_base());
    }

    #[test]
    fn test_api_base_needs_scheme() {
        let config = Config {
            api_base_url: "httpbin/api".to_string(),
            ..Config::default()
        };

        assert!(!config.has_absolute_api_base());
    }

    #[test]
    fn test_config_from_env_returns_config() {
        // Values depend on the environment, only check that loading works
        let config = Config::from_env();
        assert!(!config.api_base_url.is_empty());
        assert!(!config.site_root.is_empty());
    }
}
