use axum::http::StatusCode;
use thiserror::Error;

/// Why a credential check failed. Kept distinct for `tracing` logs only; the
/// external [`AuthError`] message is uniform so the two cases are not
/// distinguishable to a caller (closes the account-enumeration hole).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFault {
    UnknownEmail,
    WrongPassword,
}

impl CredentialFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialFault::UnknownEmail => "unknown_email",
            CredentialFault::WrongPassword => "wrong_password",
        }
    }
}

/// Error taxonomy for the auth service. Each kind maps to one HTTP status via
/// [`AuthError::status_code`]; the `Display` text is the external message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad email/password pair. The inner fault distinguishes the reason for
    /// logs; the external message is uniform.
    #[error("invalid credentials")]
    InvalidCredential(CredentialFault),

    /// Account exists but has been deactivated.
    #[error("inactive account")]
    AccountDisabled,

    /// No account matches the target id.
    #[error("user {0} not found")]
    NotFound(String),

    /// Unique-email violation; carries the store's detail message.
    #[error("{0}")]
    Duplicate(String),

    /// Any other persistence, hashing or signing failure.
    #[error("internal error")]
    Internal(anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Duplicate(_) => StatusCode::CONFLICT,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
