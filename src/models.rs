//! Identity Models
//!
//! The identity entity and the request DTOs accepted by the HTTP boundary.

use crate::password::PasswordRecord;

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================
// Entities
// ============================================

/// A registered account
///
/// `credential` serializes in its stored form. Anything sent to a client must go
/// through [`crate::ResponseSerializer`], which drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub credential: PasswordRecord,
}

/// Partial change applied by [`crate::UserDirectory::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub email: Option<String>,
    pub credential: Option<PasswordRecord>,
}

impl IdentityUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.credential.is_none()
    }
}

// ============================================
// Request DTOs
// ============================================

/// Signup and signin request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Partial identity update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateIdentityRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
}

/// `GET /auth?email=` query
///
/// Without `email` every identity is listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

// ============================================
// Response DTOs
// ============================================

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
