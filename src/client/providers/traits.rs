use crate::client::{ClinicalTrialItem, LiteratureItem};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sort order requested from the literature index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Relevance,
    Date,
    Citation,
}

impl std::str::FromStr for SortMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            "citation" => Ok(Self::Citation),
            other => Err(ProviderError::InvalidQuery(format!(
                "unknown sort mode '{other}'"
            ))),
        }
    }
}

/// Literature search parameters
#[derive(Debug, Clone)]
pub struct LiteratureQuery {
    pub query: String,
    /// Maximum number of identifiers requested from the index
    pub limit: u32,
    pub sort: SortMode,
}

/// Trial registry search parameters
#[derive(Debug, Clone)]
pub struct TrialQuery {
    pub condition: String,
    /// Upper bound of the rank window, starting at rank 1
    pub limit: u32,
}

/// Errors that can occur during provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether this failure is an expected upstream condition that adapters
    /// degrade to an empty result rather than propagate
    #[must_use]
    pub const fn is_anticipated(&self) -> bool {
        !matches!(self, Self::Parse(_) | Self::Other(_))
    }

    /// Map a non-success HTTP status to a provider error
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            503 => Self::ServiceUnavailable(format!("{status}")),
            code => Self::Http {
                status: code,
                message: body.chars().take(200).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            // Body transport faults such as a truncated gzip stream. JSON
            // decoding failures are mapped to `Parse` by the providers.
            Self::Network(format!("Failed to read response body: {e}"))
        } else {
            Self::Network(format!("Request failed: {e}"))
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A literature index that supports keyword search
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Unique name/identifier for this source
    fn name(&self) -> &str;

    /// Search the index. Relevance scores are left at zero; the engine
    /// attaches them.
    async fn search(&self, query: &LiteratureQuery) -> ProviderResult<Vec<LiteratureItem>>;

    /// Health check for the source
    async fn health_check(&self) -> ProviderResult<bool> {
        let query = LiteratureQuery {
            query: "hypertension".to_string(),
            limit: 1,
            sort: SortMode::Relevance,
        };

        match self.search(&query).await {
            Ok(_) | Err(ProviderError::RateLimit) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// A clinical trial registry that supports condition search
#[async_trait]
pub trait TrialRegistry: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &TrialQuery) -> ProviderResult<Vec<ClinicalTrialItem>>;

    async fn health_check(&self) -> ProviderResult<bool> {
        let query = TrialQuery {
            condition: "hypertension".to_string(),
            limit: 1,
        };

        match self.search(&query).await {
            Ok(_) | Err(ProviderError::RateLimit) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
