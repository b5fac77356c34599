use crate::client::providers::ProviderError;
use std::time::Duration;
use thiserror::Error;

/// Error type for the research engine and its configuration layer
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Upstream errors (anticipated, normally neutralized inside adapters)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream source unavailable: {source_name} - {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    // Caller-facing errors
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{resource} not found for '{key}'")]
    NotFound { resource: String, key: String },

    // Surfaced by the engine core
    #[error("Unexpected response from {source_name}: {message}")]
    UnexpectedResponse { source_name: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),
}

/// Error categorization following the engine's failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// An external knowledge source failed or timed out
    UpstreamUnavailable,
    /// A lookup key has no entry; callers decide whether that is an error
    NotFound,
    /// Request input failed validation
    MalformedInput,
    /// Bug or contract violation inside the engine
    UnexpectedInternalFailure,
    /// The caller abandoned the request
    Cancelled,
}

impl Error {
    /// Categorize the error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::UpstreamUnavailable { .. } | Self::Timeout { .. } => {
                ErrorCategory::UpstreamUnavailable
            }
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidInput { .. } | Self::Config(_) => ErrorCategory::MalformedInput,
            Self::Cancelled(_) => ErrorCategory::Cancelled,
            Self::Io(_) | Self::Serde(_) | Self::UnexpectedResponse { .. } | Self::Internal(_) => {
                ErrorCategory::UnexpectedInternalFailure
            }
        }
    }

    /// Whether the engine core may propagate this error to its caller.
    ///
    /// Anything else must be converted into an empty or absent result at the
    /// adapter boundary.
    pub const fn is_surfaced(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::UnexpectedInternalFailure | ErrorCategory::Cancelled
        )
    }

    /// Whether the error is the 404-equivalent produced by `require_found`
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convert a provider failure, naming the source it came from
    pub fn from_provider(source_name: &str, err: ProviderError) -> Self {
        if err.is_anticipated() {
            Self::UpstreamUnavailable {
                source_name: source_name.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::UnexpectedResponse {
                source_name: source_name.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Self::from_provider("provider", err)
    }
}
