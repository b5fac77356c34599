use super::traits::{ProviderError, ProviderResult, TrialQuery, TrialRegistry};
use crate::client::{ClinicalTrialItem, HttpClientConfig, CLINICAL_TRIALS_ORIGIN};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

/// Study-fields response envelope
#[derive(Debug, Deserialize)]
struct StudyFieldsEnvelope {
    #[serde(rename = "StudyFieldsResponse")]
    response: StudyFieldsResponse,
}

#[derive(Debug, Deserialize)]
struct StudyFieldsResponse {
    #[serde(rename = "NStudiesFound", default)]
    studies_found: u64,
    #[serde(rename = "StudyFields", default)]
    study_fields: Vec<StudyRecord>,
}

/// One study; the registry returns every projected field as an array
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StudyRecord {
    #[serde(rename = "NCTId")]
    nct_id: Vec<String>,
    #[serde(rename = "BriefTitle")]
    brief_title: Vec<String>,
    #[serde(rename = "Condition")]
    condition: Vec<String>,
    #[serde(rename = "Phase")]
    phase: Vec<String>,
    #[serde(rename = "OverallStatus")]
    overall_status: Vec<String>,
    #[serde(rename = "StartDate")]
    start_date: Vec<String>,
    #[serde(rename = "CompletionDate")]
    completion_date: Vec<String>,
    #[serde(rename = "StudyType")]
    study_type: Vec<String>,
}

fn first(values: Vec<String>) -> String {
    values.into_iter().next().unwrap_or_default()
}

/// ClinicalTrials.gov study-fields registry
pub struct ClinicalTrialsProvider {
    client: Client,
    base_url: String,
    statuses: Vec<String>,
    fields: Vec<String>,
}

impl ClinicalTrialsProvider {
    /// Create a provider from the trials section of the configuration
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = HttpClientConfig::from_config(config, config.trials.timeout_secs).build()?;

        Ok(Self {
            client,
            base_url: config.trials.base_url.clone(),
            statuses: config.trials.statuses.clone(),
            fields: config.trials.fields.clone(),
        })
    }

    /// Condition expression with the recruitment-status filter applied
    fn build_expression(&self, condition: &str) -> String {
        let statuses = self
            .statuses
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.contains([' ', ',']) {
                    format!("\"{s}\"")
                } else {
                    s.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" OR ");

        format!("{} AND AREA[OverallStatus]({statuses})", condition.trim())
    }

    fn build_search_url(&self, query: &TrialQuery) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("expr", &self.build_expression(&query.condition))
            .append_pair("fields", &self.fields.join(","))
            .append_pair("min_rnk", "1")
            .append_pair("max_rnk", &query.limit.max(1).to_string())
            .append_pair("fmt", "json");

        Ok(url)
    }

    fn convert_study(record: StudyRecord) -> ClinicalTrialItem {
        let id = first(record.nct_id);
        ClinicalTrialItem {
            url: format!("https://clinicaltrials.gov/study/{id}"),
            id,
            title: first(record.brief_title),
            condition: first(record.condition),
            phase: first(record.phase),
            status: first(record.overall_status),
            start_date: first(record.start_date),
            completion_date: first(record.completion_date),
            study_type: first(record.study_type),
            source: CLINICAL_TRIALS_ORIGIN.to_string(),
        }
    }

    fn parse_response(text: &str) -> ProviderResult<Vec<ClinicalTrialItem>> {
        let envelope: StudyFieldsEnvelope = serde_json::from_str(text)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse registry JSON: {e}")))?;

        debug!(
            "Registry reports {} matching studies",
            envelope.response.studies_found
        );

        Ok(envelope
            .response
            .study_fields
            .into_iter()
            .map(Self::convert_study)
            .filter(|trial| !trial.id.is_empty())
            .collect())
    }
}

#[async_trait]
impl TrialRegistry for ClinicalTrialsProvider {
    fn name(&self) -> &str {
        "clinical_trials"
    }

    async fn search(&self, query: &TrialQuery) -> ProviderResult<Vec<ClinicalTrialItem>> {
        let start_time = Instant::now();
        info!(
            "Searching trial registry for: {} (limit {})",
            query.condition, query.limit
        );

        let url = self.build_search_url(query)?;
        debug!("Trial registry URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let text = response.text().await?;
        let trials = Self::parse_response(&text)?;

        info!(
            "Trial registry search completed: {} trials in {:?}",
            trials.len(),
            start_time.elapsed()
        );
        Ok(trials)
    }
}
