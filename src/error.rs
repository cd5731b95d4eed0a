//! Error types for the stream gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Error types that can occur while serving a file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid capability hash: {0}")]
    InvalidCapability(String),

    #[error("Range not satisfiable for file of {file_size} bytes")]
    RangeNotSatisfiable { file_size: u64 },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::IoError(err.to_string())
    }
}

impl GatewayError {
    /// Determine if resolution should be retried on a different session
    ///
    /// Only transient backend failures qualify. Identifier, capability and
    /// range errors are permanent for the request.
    pub fn should_retry(&self) -> bool {
        matches!(self, GatewayError::BackendUnavailable(_))
    }

    /// Convert error to HTTP status code
    ///
    /// - NotFound: 404
    /// - InvalidCapability: 403
    /// - RangeNotSatisfiable: 416
    /// - everything else (including exhausted backend retries): 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            GatewayError::NotFound(_) => 404,
            GatewayError::InvalidCapability(_) => 403,
            GatewayError::RangeNotSatisfiable { .. } => 416,
            GatewayError::BackendUnavailable(_) => 500,
            GatewayError::ConfigError(_) => 500,
            GatewayError::IoError(_) => 500,
            GatewayError::InternalError(_) => 500,
        }
    }

    /// Short plain-text body sent to the client
    ///
    /// Never includes backend details; those only go to the log.
    pub fn client_message(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "404: File not found",
            GatewayError::InvalidCapability(_) => "403: Invalid hash",
            GatewayError::RangeNotSatisfiable { .. } => "416: Range not satisfiable",
            _ => "500: Internal server error",
        }
    }

    /// Create a BackendUnavailable error from anything displayable
    pub fn backend(message: impl Into<String>) -> Self {
        GatewayError::BackendUnavailable(message.into())
    }
}
