//! RustPress Identity Service
//!
//! Email/password identity for RustPress providing:
//! - Signup and signin with salted Argon2id credentials
//! - Constant-time password verification
//! - Cookie sessions resolved to the current identity on demand
//! - Allow-list projection so credentials never reach a client
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `DATABASE_URL` - SQLite connection string (default: "sqlite://identity.db")
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `BIND_ADDRESS` - HTTP listen address (default: "127.0.0.1:3000")
//! - `SESSION_COOKIE_NAME` - Session cookie name (default: "session")
//! - `SESSION_COOKIE_SECURE` - Add the `Secure` cookie attribute (default: false)
//! - `SESSION_TTL_SECS` - Session lifetime in seconds (default: 86400)
//! - `SESSION_MAX_ENTRIES` - Live sessions kept before the oldest is evicted (default: 10000)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_identity::{build_state, create_routes, IdentityConfig};
//!
//! let config = IdentityConfig::from_env();
//! config.validate()?;
//!
//! let state = build_state(&config).await?;
//! let app = create_routes(state);
//! ```

pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod serializer;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use config::IdentityConfig;
pub use database::SqliteDirectory;
pub use directory::{InMemoryDirectory, UserDirectory};
pub use error::AuthError;
pub use extractors::Session;
pub use handlers::{create_routes, AppState, SharedState};
pub use models::*;
pub use password::{PasswordHasher, PasswordRecord};
pub use serializer::ResponseSerializer;
pub use service::AuthService;
pub use session::{resolve_current_identity, SessionState, SessionStore};

use std::sync::Arc;

/// Connect to the configured database, migrate it, and wire the services
pub async fn build_state(config: &IdentityConfig) -> Result<SharedState, AuthError> {
    tracing::info!("Activating RustPress Identity");

    let pool = database::connect(config).await?;
    database::run_migrations(&pool).await?;

    let directory = Arc::new(SqliteDirectory::new(pool));
    let state = Arc::new(AppState::new(directory, config));

    tracing::info!("RustPress Identity activated successfully");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_against_memory_database() {
        let config = IdentityConfig {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            ..IdentityConfig::default()
        };

        let state = build_state(&config).await.unwrap();
        let identity = state.auth.signup("foo@bar.com", "abc123").await.unwrap();

        let found = state.auth.directory().find_by_id(identity.id).await.unwrap();
        assert_eq!(found, Some(identity));
    }

    #[tokio::test]
    async fn test_build_state_fails_on_unopenable_database() {
        let config = IdentityConfig {
            database_url: "sqlite:///missing/dir/identity.db".into(),
            ..IdentityConfig::default()
        };

        assert!(build_state(&config).await.is_err());
    }
}
