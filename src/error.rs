//! Identity Error Types
//!
//! Centralized error handling for signup, signin and the identity endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Identity errors
///
/// The first three variants are domain outcomes of [`crate::AuthService`] and are
/// surfaced unchanged. The remaining variants are boundary or infrastructure failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email already in use")]
    DuplicateIdentity,

    #[error("User not found")]
    IdentityNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User with id {0} not found")]
    UserNotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::DuplicateIdentity => {
                (StatusCode::BAD_REQUEST, "email_in_use", self.to_string())
            }
            AuthError::IdentityNotFound => {
                (StatusCode::NOT_FOUND, "user_not_found", self.to_string())
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AuthError::UserNotFound(_) => {
                (StatusCode::NOT_FOUND, "user_not_found", self.to_string())
            }
            AuthError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AuthError::Config(_) | AuthError::Database(_) | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                tracing::warn!("Unique constraint rejected identity write");
                return AuthError::DuplicateIdentity;
            }
        }
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        tracing::error!("Key derivation error: {:?}", err);
        AuthError::Internal
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Hashing worker failed: {:?}", err);
        AuthError::Internal
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        assert_eq!(
            AuthError::DuplicateIdentity.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::IdentityNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_infrastructure_errors_are_generic() {
        for err in [
            AuthError::Database("disk I/O error".into()),
            AuthError::Config("bad".into()),
            AuthError::Internal,
        ] {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_not_found_and_invalid_credentials_stay_distinct() {
        assert_ne!(AuthError::IdentityNotFound, AuthError::InvalidCredentials);
        assert_ne!(
            AuthError::IdentityNotFound.to_string(),
            AuthError::InvalidCredentials.to_string()
        );
    }
}
