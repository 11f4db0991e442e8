//! Identity Configuration
//!
//! All configuration values are loaded from environment variables.
//! Password hashing cost is fixed in [`crate::password`] and is not configurable.

use crate::error::AuthError;
use std::env;

/// Longest accepted session lifetime: one year
const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 3600;

/// Identity service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// SQLite connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Pool size (from DATABASE_MAX_CONNECTIONS env var)
    pub max_connections: u32,

    /// Listen address for the HTTP server (from BIND_ADDRESS env var)
    pub bind_address: String,

    /// Name of the session cookie (from SESSION_COOKIE_NAME env var)
    pub session_cookie_name: String,

    /// Mark the session cookie `Secure` (from SESSION_COOKIE_SECURE env var)
    pub session_cookie_secure: bool,

    /// Session lifetime in seconds (from SESSION_TTL_SECS env var)
    pub session_ttl_secs: u64,

    /// Upper bound on live sessions (from SESSION_MAX_ENTRIES env var)
    pub max_sessions: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://identity.db".to_string(),
            max_connections: 5,
            bind_address: "127.0.0.1:3000".to_string(),
            session_cookie_name: "session".to_string(),
            session_cookie_secure: false,
            session_ttl_secs: 24 * 3600,
            max_sessions: 10_000,
        }
    }
}

impl IdentityConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),

            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),

            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),

            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),

            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .ok()
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.session_cookie_secure),

            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_ttl_secs),

            max_sessions: env::var("SESSION_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_sessions),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.database_url.trim().is_empty() {
            return Err(AuthError::Config("DATABASE_URL must not be empty".to_string()));
        }

        if self.max_connections == 0 {
            return Err(AuthError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        if self.session_cookie_name.is_empty()
            || self
                .session_cookie_name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | '=' | ','))
        {
            return Err(AuthError::Config(
                "SESSION_COOKIE_NAME must be a plain cookie token".to_string(),
            ));
        }

        if self.session_ttl_secs == 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(AuthError::Config(format!(
                "SESSION_TTL_SECS must be between 1 and {}",
                MAX_SESSION_TTL_SECS
            )));
        }

        if self.max_sessions == 0 {
            return Err(AuthError::Config(
                "SESSION_MAX_ENTRIES must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(IdentityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_cookie_name() {
        for name in ["", "my session", "a;b", "a=b"] {
            let config = IdentityConfig {
                session_cookie_name: name.to_string(),
                ..IdentityConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {name:?}");
        }
    }

    #[test]
    fn test_config_validation_zero_connections() {
        let config = IdentityConfig {
            max_connections: 0,
            ..IdentityConfig::default()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_validation_session_limits() {
        for ttl in [0, MAX_SESSION_TTL_SECS + 1] {
            let config = IdentityConfig {
                session_ttl_secs: ttl,
                ..IdentityConfig::default()
            };
            assert!(matches!(config.validate(), Err(AuthError::Config(_))));
        }

        let config = IdentityConfig {
            max_sessions: 0,
            ..IdentityConfig::default()
        };
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }
}
