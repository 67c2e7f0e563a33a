use thiserror::Error;

/// Failures reported by the identity service port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The presented credential (or login secret) was not accepted.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The backend refused the request as invalid (HTTP 400/409/422).
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unavailable: {message}")]
    Unavailable { message: String },

    /// The backend answered with something we cannot trust.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl IdentityError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
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

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Transport or backend fault: nothing was decided server-side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Protocol { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Rejected { message, .. }
            | Self::Unavailable { message }
            | Self::Protocol { message } => message,
        }
    }
}

/// Credential store write failures. Loads never fail.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No active session to suspend")]
    NothingToSuspend,

    #[error("A suspended credential is already stored")]
    AlreadySuspended,

    #[error("The suspended credential cannot be the active one")]
    SelfReference,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
