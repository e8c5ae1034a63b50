use bridge_traits::BridgeError;
use thiserror::Error;

/// Why a premium request was refused at the credential step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    /// No `Authorization` header.
    Missing,
    /// Header present but not `Bearer <token>`.
    Malformed,
    /// Token did not resolve to a user.
    Rejected,
}

impl CredentialFailure {
    pub fn message(&self) -> &'static str {
        match self {
            CredentialFailure::Missing | CredentialFailure::Malformed => "No token provided",
            CredentialFailure::Rejected => "Invalid token",
        }
    }
}

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Audio file not found: {resource}")]
    NotFound { resource: String },

    #[error("Authentication required: {}", .0.message())]
    AuthenticationRequired(CredentialFailure),

    #[error("Active subscription required")]
    SubscriptionRequired,

    #[error("Access check failed: {0}")]
    Backend(String),
}

impl AccessError {
    /// HTTP status the denial is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::NotFound { .. } => 404,
            AccessError::AuthenticationRequired(_) => 401,
            AccessError::SubscriptionRequired => 403,
            AccessError::Backend(_) => 500,
        }
    }

    /// Message safe to show a listener; backend detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessError::NotFound { .. } => "Audio file not found",
            AccessError::AuthenticationRequired(failure) => failure.message(),
            AccessError::SubscriptionRequired => "Active subscription required",
            AccessError::Backend(_) => "Failed to serve audio file",
        }
    }
}

impl From<BridgeError> for AccessError {
    fn from(err: BridgeError) -> Self {
        AccessError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
