use thiserror::Error;

use beacon_core::DomainError;

use crate::authenticator::AUTHENTICATION_FAILED;
use crate::service::TOKEN_ISSUE_FAILED;
use crate::store::StoreError;

/// Client text for a 500 whose detail must stay in the logs.
pub const INTERNAL_ERROR: &str = "Internal server error";
pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable";

/// `Internal` messages that are already client-safe.
const PUBLIC_INTERNAL: &[&str] = &[AUTHENTICATION_FAILED, TOKEN_ISSUE_FAILED];

/// Caller-facing failure of an auth operation.
///
/// The message carried by the 4xx variants is exactly what clients see.
/// `Unavailable` and `Internal` detail is for logs only, apart from a few
/// fixed `Internal` messages; see [`AuthError::public_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Unavailable(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to hand to a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unavailable(_) => SERVICE_UNAVAILABLE.to_string(),
            Self::Internal(msg) if PUBLIC_INTERNAL.contains(&msg.as_str()) => msg.clone(),
            Self::Internal(_) => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => Self::Validation(msg),
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}
