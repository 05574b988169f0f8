//! Authentication error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingCredentials,

    #[error("Authorization header must be in the format 'Bearer {{token}}'")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials
            | AuthError::MalformedHeader
            | AuthError::InvalidToken => "UNAUTHORIZED",
            AuthError::Signing(_) | AuthError::Hashing(_) => "INTERNAL_ERROR",
        }
    }

    /// Caller-side failure (bad or missing credentials) as opposed to ours.
    pub fn is_client_error(&self) -> bool {
        self.code() == "UNAUTHORIZED"
    }
}
