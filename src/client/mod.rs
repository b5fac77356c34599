pub mod providers;

pub use providers::{
    ClinicalTrialsProvider, LiteratureQuery, LiteratureSource, ProviderError, PubMedProvider,
    SortMode, TrialQuery, TrialRegistry,
};

use crate::config::Config;
use providers::ProviderResult;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Origin tag attached to literature results
pub const PUBMED_ORIGIN: &str = "PubMed";
/// Origin tag attached to trial registry results
pub const CLINICAL_TRIALS_ORIGIN: &str = "ClinicalTrials.gov";

/// HTTP client configuration for upstream knowledge sources
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!(
                "clinical-research-engine/{} (Clinical Research Tool)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl HttpClientConfig {
    /// Client settings for a source with the given request timeout
    #[must_use]
    pub fn from_config(config: &Config, timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            user_agent: config.engine.user_agent.clone(),
            ..Self::default()
        }
    }

    /// Build a `reqwest` client with these settings
    pub fn build(&self) -> ProviderResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {e}")))
    }
}

/// A literature record returned by the literature index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiteratureItem {
    /// Index-local identifier (PMID)
    pub id: String,
    pub title: String,
    /// Authors flattened for display, e.g. `"Smith J, Doe A"`
    pub authors: String,
    /// Source journal
    pub journal: String,
    /// Publication date as reported upstream
    pub publish_date: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// External identifier, the DOI when the index reports one
    pub external_id: Option<String>,
    pub url: String,
    /// Relevance to the query, 0 to 100
    pub relevance_score: u8,
    pub source: String,
}

/// A clinical trial record returned by the trial registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTrialItem {
    /// Registry identifier (NCT number)
    pub id: String,
    pub title: String,
    pub condition: String,
    pub phase: String,
    pub status: String,
    pub start_date: String,
    pub completion_date: String,
    pub study_type: String,
    pub url: String,
    pub source: String,
}
