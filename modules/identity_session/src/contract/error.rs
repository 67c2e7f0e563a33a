use thiserror::Error;

use crate::contract::model::SessionMode;

/// Errors surfaced by identity-mutating session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Identity not found: {message}")]
    NotFound { message: String },

    #[error("Not allowed while {mode}: {message}")]
    InvalidState { mode: SessionMode, message: String },

    #[error("Another identity change is already in flight")]
    Busy,

    #[error("Identity service unavailable: {message}")]
    Unavailable { message: String },

    #[error("Session credential was rejected; the session has been closed")]
    StaleSession,
}

impl SessionError {
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_state(mode: SessionMode, message: impl Into<String>) -> Self {
        Self::InvalidState {
            mode,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Calls made in a mode that forbids them. The session is untouched.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::Busy)
    }

    /// Only `Unavailable` leaves the caller something to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors surfaced by the resource client gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No active session")]
    NotAuthenticated,

    #[error("Session credential was rejected; the session has been closed")]
    StaleSession,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Invalid response body: {message}")]
    Decode { message: String },

    #[error("Invalid resource path '{path}'")]
    InvalidPath { path: String },
}

impl GatewayError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::IdentityError> for SessionError {
    fn from(error: crate::domain::error::IdentityError) -> Self {
        use crate::domain::error::IdentityError::*;
        match error {
            Unauthorized { .. } => Self::StaleSession,
            Forbidden { message } => Self::forbidden(message),
            NotFound { message } => Self::not_found(message),
            Rejected { message, .. } => Self::forbidden(message),
            Unavailable { message } | Protocol { message } => Self::unavailable(message),
        }
    }
}
