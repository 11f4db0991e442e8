//! Authentication Service
//!
//! Signup and signin orchestration over a [`UserDirectory`] and the
//! [`PasswordHasher`]. Session handling is left to the caller.

use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::Identity;
use crate::password::PasswordHasher;

use std::sync::Arc;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: PasswordHasher,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(directory: Arc<dyn UserDirectory>, hasher: PasswordHasher) -> Self {
        Self { directory, hasher }
    }

    /// Get reference to the directory
    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    // ============================================
    // Signup
    // ============================================

    /// Register a new identity
    ///
    /// The lookup is only a fast path. Two concurrent signups can both pass it, in
    /// which case the directory's uniqueness check rejects the second create.
    pub async fn signup(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !self.directory.find_by_email(email).await?.is_empty() {
            tracing::debug!(email = %email, "Email already registered");
            tracing::warn!("Signup rejected, email already in use");
            return Err(AuthError::DuplicateIdentity);
        }

        let credential = self.hasher.hash(password).await?;

        let identity = match self.directory.create(email, credential).await {
            Ok(identity) => identity,
            Err(AuthError::DuplicateIdentity) => {
                tracing::warn!("Signup lost a race for the same email");
                return Err(AuthError::DuplicateIdentity);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = identity.id, "Identity created");
        Ok(identity)
    }

    // ============================================
    // Signin
    // ============================================

    /// Check an email/password pair
    pub async fn signin(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = match self.directory.find_by_email(email).await?.into_iter().next() {
            Some(identity) => identity,
            None => {
                self.hasher.burn(password).await?;
                tracing::debug!(email = %email, "No identity registered");
                tracing::warn!("Signin rejected, unknown email");
                return Err(AuthError::IdentityNotFound);
            }
        };

        if !self.hasher.verify(password, &identity.credential).await? {
            tracing::warn!(user_id = identity.id, "Signin rejected, invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = identity.id, "Signin succeeded");
        Ok(identity)
    }
}
