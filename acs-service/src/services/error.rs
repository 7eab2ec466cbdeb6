use thiserror::Error;

/// Failures raised by adapters and the transport.
///
/// These never reach callers directly: the dispatcher folds every variant
/// into an [`AccessProvisioningResult`](crate::models::AccessProvisioningResult).
#[derive(Debug, Error)]
pub enum AcsError {
    /// Session login rejected. Carries the raw response body or HTTP status.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("ACS API returned {status}: {status_text}")]
    Transport { status: u16, status_text: String },

    /// The request never produced an HTTP status.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unsupported ACS type: {0}")]
    UnsupportedProvider(String),

    #[error("ACS reference ID is required for revocation")]
    RevocationPrecondition,

    #[error("{0} integration not yet implemented")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to encode ACS request: {0}")]
    Encoding(String),

    #[error("Invalid response from ACS: {0}")]
    InvalidResponse(String),

    /// The vendor answered but refused the operation.
    #[error("{0}")]
    Vendor(String),
}

impl AcsError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AcsError::Authentication(_) => "authentication",
            AcsError::Transport { .. } => "transport",
            AcsError::Connection(_) => "connection",
            AcsError::UnsupportedProvider(_) => "unsupported_provider",
            AcsError::RevocationPrecondition => "revocation_precondition",
            AcsError::NotImplemented(_) => "not_implemented",
            AcsError::Configuration(_) => "configuration",
            AcsError::Encoding(_) => "encoding",
            AcsError::InvalidResponse(_) => "invalid_response",
            AcsError::Vendor(_) => "vendor",
        }
    }
}
